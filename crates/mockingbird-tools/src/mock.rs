//! Placeholder results for stubs without a declared mock response.
//!
//! Stubs saved before mock responses existed carry an output schema instead.
//! The placeholders produced here are stable but only loosely typed: strings
//! become `mock_<key>`, numbers `0`, booleans `false`.

use serde_json::{Map, Value, json};

const GENERIC_MESSAGE: &str = "Function executed successfully";

/// The result returned when nothing more specific is known.
#[must_use]
pub fn generic_success() -> Value {
    json!({ "result": GENERIC_MESSAGE })
}

/// Synthesizes a placeholder value from a legacy output schema.
///
/// ```
/// use mockingbird_tools::mock::from_output_schema;
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": {"id": {"type": "string"}, "tags": {"type": "array"}}
/// });
/// assert_eq!(from_output_schema(&schema), json!({"id": "mock_id", "tags": []}));
/// ```
#[must_use]
pub fn from_output_schema(schema: &Value) -> Value {
    let Some(schema) = schema.as_object() else {
        return generic_success();
    };

    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            let mut data = Map::new();
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (key, property) in properties {
                    data.insert(key.clone(), placeholder(key, property));
                }
            }
            Value::Object(data)
        }
        Some("array") => Value::Array(Vec::new()),
        Some("string") => Value::String(GENERIC_MESSAGE.to_string()),
        Some("number") => json!(0),
        Some("boolean") => Value::Bool(false),
        _ => Value::Object(Map::new()),
    }
}

fn placeholder(key: &str, property: &Value) -> Value {
    match property.get("type").and_then(Value::as_str) {
        Some("string") => Value::String(format!("mock_{key}")),
        Some("number") => json!(0),
        Some("boolean") => Value::Bool(false),
        Some("array") => Value::Array(Vec::new()),
        Some("object") => Value::Object(Map::new()),
        _ => Value::Null,
    }
}

//! Function-name validation and input-schema inference.

use serde_json::{Map, Value, json};
use thiserror::Error;

/// Why a function name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionNameError {
    #[error("Function name is required")]
    Missing,
    #[error(
        "Function name can only contain letters, numbers, underscores, and hyphens. No spaces or special characters allowed."
    )]
    InvalidCharacters,
}

/// Checks a function name against `^[a-zA-Z0-9_-]+$`.
///
/// # Errors
///
/// Returns [`FunctionNameError::Missing`] for an empty name and
/// [`FunctionNameError::InvalidCharacters`] for anything outside the pattern.
pub fn validate_function_name(name: &str) -> Result<(), FunctionNameError> {
    if name.is_empty() {
        return Err(FunctionNameError::Missing);
    }
    if !name.chars().all(crate::registry::is_name_char) {
        return Err(FunctionNameError::InvalidCharacters);
    }
    Ok(())
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Object(_) | Value::Null => "object",
    }
}

/// Infers an input schema from an example payload.
///
/// Every top-level schema carries `type`, `properties` and `required`. Object
/// payloads list each key as a required property: scalars are typed, nested
/// objects recurse, arrays take the schema of their first element as `items`,
/// and anything else (such as `null`) is typed as a string.
///
/// ```
/// use mockingbird_tools::infer_schema;
/// use serde_json::json;
///
/// let schema = infer_schema(&json!({"city": "Tokyo", "days": 3}));
/// assert_eq!(schema["properties"]["days"], json!({"type": "number"}));
/// assert_eq!(schema["required"], json!(["city", "days"]));
/// ```
#[must_use]
pub fn infer_schema(example: &Value) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    if let Value::Object(fields) = example {
        for (key, value) in fields {
            let property = match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    json!({ "type": type_name(value) })
                }
                Value::Array(items) => json!({
                    "type": "array",
                    "items": items.first().map_or_else(|| json!({}), infer_schema),
                }),
                Value::Object(_) => infer_schema(value),
                Value::Null => json!({ "type": "string" }),
            };
            properties.insert(key.clone(), property);
            required.push(Value::String(key.clone()));
        }
    }

    json!({
        "type": type_name(example),
        "properties": properties,
        "required": required,
    })
}

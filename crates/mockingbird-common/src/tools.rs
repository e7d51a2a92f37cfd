//! Function stubs, tool calls and tool results.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use typed_builder::TypedBuilder;

/// Arguments of a tool call, as a JSON object.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

/// Returns the parameter schema used when a function declares none.
#[must_use]
pub fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// Describes a function that can be called by an LLM.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Function {
    /// The name of the function.
    pub name: String,
    /// Human-readable description of what the function does.
    pub description: String,
    /// JSON Schema definition of the function's parameters.
    pub parameters: serde_json::Value,
}

/// Represents a tool available to the LLM, wrapping a function.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder, Eq, PartialEq)]
pub struct Tool {
    /// The type of tool (defaults to "function").
    #[serde(rename = "type")]
    #[builder(default = "function".to_string())]
    pub r#type: String,
    /// The function definition.
    pub function: Function,
}

// A present `mockResponse` is kept even when it is `null`; only absence means "none".
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// A mock function stub the model may call.
///
/// The stub never executes anything: when the model calls it, the declared
/// `mock_response` is returned instead. Stubs created before mock responses
/// existed may carry a legacy `output_schema` from which a placeholder result is
/// synthesized.
///
/// # Examples
///
/// ```
/// use mockingbird_common::FunctionDefinition;
/// use serde_json::json;
///
/// let stub: FunctionDefinition = serde_json::from_value(json!({
///     "id": "5b0c",
///     "name": "getExchangeRate",
///     "description": "Current exchange rate",
///     "inputSchema": {"type": "object", "properties": {}, "required": []},
///     "mockResponse": {"rate": 31348.75}
/// }))
/// .unwrap();
///
/// assert_eq!(stub.mock_response, Some(json!({"rate": 31348.75})));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    /// Storage identifier, assigned on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub id: Option<String>,

    /// Function name, `[a-zA-Z0-9_-]+` for stubs created through validation.
    pub name: String,

    /// What the function does, shown to the model.
    #[serde(default)]
    #[builder(default)]
    pub description: String,

    /// JSON-schema-like description of the arguments.
    #[serde(default = "empty_object_schema")]
    #[builder(default = empty_object_schema())]
    pub input_schema: serde_json::Value,

    /// Example input the schema was inferred from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub mock_input: Option<serde_json::Value>,

    /// Value returned whenever the model calls this function.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub mock_response: Option<serde_json::Value>,

    /// Legacy result schema, used only when `mock_response` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub output_schema: Option<serde_json::Value>,
}

impl FunctionDefinition {
    /// Converts this stub into the flat-array tool shape under the given name.
    #[must_use]
    pub fn to_tool(&self, name: impl Into<String>) -> Tool {
        let parameters = if self.input_schema.is_object() {
            self.input_schema.clone()
        } else {
            empty_object_schema()
        };

        Tool::builder()
            .function(Function {
                name: name.into(),
                description: self.description.clone(),
                parameters,
            })
            .build()
    }
}

/// The function half of a normalized tool call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionCall {
    /// The function name as the model spelled it.
    pub name: String,
    /// Decoded arguments.
    #[serde(default)]
    pub arguments: Arguments,
}

/// A tool call requested by the model, normalized across providers.
///
/// Serializes as `{id, function: {name, arguments}}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned identifier, unique within one response.
    pub id: String,
    /// The function being invoked.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Creates a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }

    /// Decodes JSON-encoded arguments into a tool call.
    ///
    /// Unparseable or non-object arguments are logged and replaced with an
    /// empty mapping. An empty string decodes as an empty mapping without a
    /// warning.
    pub fn from_encoded(id: impl Into<String>, name: impl Into<String>, encoded: &str) -> Self {
        let name = name.into();
        let arguments = if encoded.trim().is_empty() {
            Arguments::new()
        } else {
            match serde_json::from_str::<serde_json::Value>(encoded) {
                Ok(value) => Self::object_or_empty(&name, value),
                Err(e) => {
                    warn!("Failed to parse arguments for tool call '{name}': {e}");
                    Arguments::new()
                }
            }
        };
        Self::new(id, name, arguments)
    }

    /// Builds a tool call from structured arguments.
    ///
    /// Non-object input is logged and replaced with an empty mapping.
    pub fn from_structured(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        let name = name.into();
        let arguments = Self::object_or_empty(&name, input);
        Self::new(id, name, arguments)
    }

    fn object_or_empty(name: &str, value: serde_json::Value) -> Arguments {
        match value {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Arguments::new(),
            other => {
                warn!("Arguments for tool call '{name}' are not an object: {other}");
                Arguments::new()
            }
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Returns the arguments re-encoded as a JSON string.
    #[must_use]
    pub fn arguments_json(&self) -> String {
        serde_json::Value::Object(self.function.arguments.clone()).to_string()
    }
}

/// The function half of a tool result.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionResult {
    /// Name of the called function.
    pub name: String,
    /// The mock value produced for the call.
    pub result: serde_json::Value,
}

/// The result produced for one [`ToolCall`].
///
/// Serializes as `{id, function: {name, result}}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolResult {
    /// Identifier of the originating tool call.
    pub id: String,
    /// The function name and its result.
    pub function: FunctionResult,
}

impl ToolResult {
    /// Creates the result for a tool call.
    #[must_use]
    pub fn for_call(call: &ToolCall, result: serde_json::Value) -> Self {
        Self {
            id: call.id.clone(),
            function: FunctionResult {
                name: call.function.name.clone(),
                result,
            },
        }
    }

    /// Returns the result encoded as a JSON string.
    #[must_use]
    pub fn result_json(&self) -> String {
        self.function.result.to_string()
    }
}

/// The outcome of one conversation run.
///
/// Every entry in `function_calls` has exactly one entry in
/// `function_results` with the same id, in the same relative order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResult {
    /// The final natural-language answer.
    pub assistant_message: String,
    /// Every tool call the model made, in order.
    pub function_calls: Vec<ToolCall>,
    /// The mock result for each tool call, in order.
    pub function_results: Vec<ToolResult>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_call_serialization() {
        let mut args = Arguments::new();
        args.insert("baseCurrency".to_string(), json!("GBP"));
        let call = ToolCall::new("call_1", "getExchangeRate", args);

        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({"id": "call_1", "function": {"name": "getExchangeRate", "arguments": {"baseCurrency": "GBP"}}})
        );
    }

    #[test]
    fn test_from_encoded_parses_object() {
        let call = ToolCall::from_encoded(
            "call_1",
            "getExchangeRate",
            r#"{"baseCurrency":"GBP","targetCurrency":"VND"}"#,
        );

        assert_eq!(call.function.arguments.get("baseCurrency"), Some(&json!("GBP")));
        assert_eq!(call.function.arguments.get("targetCurrency"), Some(&json!("VND")));
    }

    #[test]
    fn test_from_encoded_recovers_from_garbage() {
        let call = ToolCall::from_encoded("call_1", "lookup", "{not json");
        assert!(call.function.arguments.is_empty());

        let call = ToolCall::from_encoded("call_2", "lookup", "[1, 2]");
        assert!(call.function.arguments.is_empty());

        let call = ToolCall::from_encoded("call_3", "lookup", "");
        assert!(call.function.arguments.is_empty());
    }

    #[test]
    fn test_from_structured_rejects_non_object() {
        let call = ToolCall::from_structured("toolu_1", "lookup", json!("text"));
        assert!(call.function.arguments.is_empty());

        let call = ToolCall::from_structured("toolu_2", "lookup", json!({"id": 7}));
        assert_eq!(call.arguments_json(), r#"{"id":7}"#);
    }

    #[test]
    fn test_tool_result_for_call() {
        let call = ToolCall::new("call_9", "lookup", Arguments::new());
        let result = ToolResult::for_call(&call, json!({"rate": 31348.75}));

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"id": "call_9", "function": {"name": "lookup", "result": {"rate": 31348.75}}})
        );
        assert_eq!(result.result_json(), r#"{"rate":31348.75}"#);
    }

    #[test]
    fn test_mock_response_null_is_present() {
        let with_null: FunctionDefinition =
            serde_json::from_value(json!({"name": "noop", "mockResponse": null})).unwrap();
        assert_eq!(with_null.mock_response, Some(serde_json::Value::Null));

        let without: FunctionDefinition = serde_json::from_value(json!({"name": "noop"})).unwrap();
        assert_eq!(without.mock_response, None);
        assert_eq!(without.input_schema, empty_object_schema());
    }

    #[test]
    fn test_to_tool_defaults_parameters() {
        let def = FunctionDefinition::builder()
            .name("lookup".to_string())
            .input_schema(serde_json::Value::Null)
            .build();
        let tool = def.to_tool("lookup");

        assert_eq!(tool.r#type, "function");
        assert_eq!(tool.function.parameters, empty_object_schema());
    }

    #[test]
    fn test_conversation_result_camel_case() {
        let value = serde_json::to_value(ConversationResult::default()).unwrap();
        assert_eq!(
            value,
            json!({"assistantMessage": "", "functionCalls": [], "functionResults": []})
        );
    }

    proptest! {
        #[test]
        fn encoded_arguments_never_panic(encoded in ".*") {
            let call = ToolCall::from_encoded("id", "name", &encoded);
            prop_assert_eq!(call.id, "id");
        }

        #[test]
        fn object_arguments_survive_reencoding(key in "[a-z]{1,8}", value in any::<i64>()) {
            let mut args = Arguments::new();
            args.insert(key, json!(value));
            let call = ToolCall::new("id", "name", args.clone());
            let decoded = ToolCall::from_encoded("id", "name", &call.arguments_json());
            prop_assert_eq!(decoded.function.arguments, args);
        }
    }
}

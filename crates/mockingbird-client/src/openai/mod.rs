//! OpenAI chat completions types and client implementation.
//!
//! Tool calls arrive as a flat array on the single response choice, with
//! arguments JSON-encoded as a string. Tool results go back as individual
//! `tool` role messages.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use typed_builder::TypedBuilder;

use mockingbird_common::chat::{Message, MessageRole};
use mockingbird_common::tools::{FunctionDefinition, Tool, ToolCall};

pub mod client;
pub use client::OpenAIClient;

/// Name used when sanitization leaves nothing behind.
pub const UNNAMED_FUNCTION: &str = "unnamed_function";

/// Reduces a function name to `^[a-zA-Z0-9_-]+$` for the request's tool list.
///
/// Invalid characters become `_`, runs of `_` collapse to one, and leading or
/// trailing `_` are trimmed.
///
/// ```
/// use mockingbird_client::openai::sanitize_function_name;
///
/// assert_eq!(sanitize_function_name("get  customer.info!"), "get_customer_info");
/// assert_eq!(sanitize_function_name("???"), "unnamed_function");
/// ```
#[must_use]
pub fn sanitize_function_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        };
        if c == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(c);
    }

    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        UNNAMED_FUNCTION.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A single completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// The index of this choice in the list.
    #[serde(default)]
    pub index: u32,
    /// The message generated by the model.
    pub message: OpenAIMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

const fn default_role() -> MessageRole {
    MessageRole::Assistant
}

/// A message in the OpenAI wire format.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
pub struct OpenAIMessage {
    /// The role of the message author.
    #[serde(default = "default_role")]
    pub role: MessageRole,
    /// Text content, absent for tool-only assistant turns.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Function name on `tool` messages.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls requested by the assistant.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<SmallVec<[OpenAIToolCall; 2]>>,
    /// The call a `tool` message answers.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl From<&Message> for OpenAIMessage {
    fn from(message: &Message) -> Self {
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(OpenAIToolCall::from)
                    .collect(),
            )
        };

        let text = message.content.text();
        let content = if text.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(text)
        };

        Self::builder()
            .role(message.role)
            .content(content)
            .name(message.name.clone())
            .tool_calls(tool_calls)
            .tool_call_id(message.tool_call_id.clone())
            .build()
    }
}

/// A tool call in the OpenAI wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIToolCall {
    /// Provider-assigned call identifier.
    pub id: String,
    /// Always "function".
    #[serde(rename = "type", default = "default_tool_call_type")]
    pub r#type: String,
    /// The function invocation.
    pub function: OpenAIFunction,
}

impl From<&ToolCall> for OpenAIToolCall {
    fn from(tool_call: &ToolCall) -> Self {
        Self {
            id: tool_call.id.clone(),
            r#type: default_tool_call_type(),
            function: OpenAIFunction {
                name: tool_call.function.name.clone(),
                arguments: tool_call.arguments_json(),
            },
        }
    }
}

fn default_tool_call_type() -> String {
    "function".to_string()
}

/// A function invocation with JSON-encoded arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunction {
    /// The function name.
    pub name: String,
    /// Arguments as a JSON string. May be empty.
    #[serde(default)]
    pub arguments: String,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,
    /// The transcript.
    pub messages: Vec<OpenAIMessage>,
    /// Available tools.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// Tool selection strategy, "auto" whenever tools are present.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

impl ChatCompletionRequest {
    /// Builds a request from a transcript and the declared function stubs.
    ///
    /// Every stub is offered as a tool under its sanitized name.
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        messages: &[Message],
        functions: &[FunctionDefinition],
    ) -> Self {
        let tools: Vec<Tool> = functions
            .iter()
            .map(|f| f.to_tool(sanitize_function_name(&f.name)))
            .collect();

        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(tools), Some(serde_json::Value::String("auto".to_string())))
        };

        Self::builder()
            .model(model.into())
            .messages(messages.iter().map(OpenAIMessage::from).collect())
            .tools(tools)
            .tool_choice(tool_choice)
            .build()
    }
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAIUsage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of both.
    #[serde(default)]
    pub total_tokens: u32,
}

/// Response body for `POST /chat/completions`.
///
/// Every field except `choices` is informational and defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    /// The completion choices. Only the first is used.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAIUsage>,
}

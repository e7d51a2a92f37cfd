//! Anthropic Messages API types and client implementation.
//!
//! Responses are an ordered list of typed content blocks. Tool requests are
//! `tool_use` blocks with structured input; their results travel back as
//! `tool_result` blocks inside a single user turn.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use mockingbird_common::chat::{ContentBlock, Message, MessageContent, MessageRole};
use mockingbird_common::tools::{FunctionDefinition, empty_object_schema};

pub mod client;
pub use client::AnthropicClient;

/// The required API version header value for Anthropic API.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token budget used when none is configured.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

// ============================================================================
// Request Types
// ============================================================================

/// Role of message author in Anthropic API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnthropicRole {
    /// User message.
    User,
    /// Assistant message.
    Assistant,
}

impl From<MessageRole> for AnthropicRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::Assistant => Self::Assistant,
            // Everything that is not the assistant speaks as the user.
            MessageRole::System | MessageRole::User | MessageRole::Tool => Self::User,
        }
    }
}

/// An Anthropic message in a conversation.
///
/// Content passes through unchanged: plain text stays text, block content
/// stays blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message author.
    pub role: AnthropicRole,
    /// Either a string or an array of content blocks.
    pub content: MessageContent,
}

impl From<&Message> for AnthropicMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: AnthropicRole::from(message.role),
            content: message.content.clone(),
        }
    }
}

/// Anthropic tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicTool {
    /// Tool name.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: serde_json::Value,
}

impl From<&FunctionDefinition> for AnthropicTool {
    fn from(function: &FunctionDefinition) -> Self {
        let input_schema = if function.input_schema.is_object() {
            function.input_schema.clone()
        } else {
            empty_object_schema()
        };

        Self {
            name: function.name.clone(),
            description: function.description.clone(),
            input_schema,
        }
    }
}

/// Request for the Anthropic Messages API.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct CreateMessageRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages, without system messages.
    pub messages: Vec<AnthropicMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// System prompt.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Available tools.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
}

impl CreateMessageRequest {
    /// Builds a request from a transcript and the declared function stubs.
    ///
    /// System messages are lifted out of the transcript and joined with a
    /// newline into the `system` field.
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        max_tokens: u32,
        messages: &[Message],
        functions: &[FunctionDefinition],
    ) -> Self {
        let (system, conversation): (Vec<&Message>, Vec<&Message>) = messages
            .iter()
            .partition(|m| m.role == MessageRole::System);

        let system = if system.is_empty() {
            None
        } else {
            Some(
                system
                    .iter()
                    .map(|m| m.content.text())
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };

        let tools = if functions.is_empty() {
            None
        } else {
            Some(functions.iter().map(AnthropicTool::from).collect())
        };

        Self::builder()
            .model(model.into())
            .messages(conversation.into_iter().map(AnthropicMessage::from).collect())
            .max_tokens(max_tokens)
            .system(system)
            .tools(tools)
            .build()
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Content block types that can appear in responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseContentBlock {
    /// Text content block.
    Text {
        /// The text content.
        text: String,
    },
    /// Tool use request from the model.
    ToolUse {
        /// Unique ID for this tool use.
        id: String,
        /// Name of the tool to call.
        name: String,
        /// Input arguments as JSON.
        #[serde(default)]
        input: serde_json::Value,
    },
    /// Any block type this client does not model (thinking, citations, ...).
    #[serde(other)]
    Unsupported,
}

impl ResponseContentBlock {
    /// Converts this block into its transcript shape.
    ///
    /// Unsupported blocks have no transcript shape and yield `None`. A
    /// `tool_use` input that is missing or not an object is sent back as `{}`,
    /// the only input shape the Messages API accepts.
    #[must_use]
    pub fn to_content_block(&self) -> Option<ContentBlock> {
        match self {
            Self::Text { text } => Some(ContentBlock::text(text.clone())),
            Self::ToolUse { id, name, input } => {
                let input = if input.is_object() {
                    input.clone()
                } else {
                    serde_json::Value::Object(serde_json::Map::new())
                };
                Some(ContentBlock::tool_use(id.clone(), name.clone(), input))
            }
            Self::Unsupported => None,
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of turn.
    EndTurn,
    /// Maximum tokens reached.
    MaxTokens,
    /// Stop sequence encountered.
    StopSequence,
    /// Model wants to use a tool.
    ToolUse,
    /// Model refused to respond.
    Refusal,
    /// A reason this client does not know about.
    #[serde(other)]
    Other,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    /// Input tokens consumed.
    #[serde(default)]
    pub input_tokens: u32,
    /// Output tokens generated.
    #[serde(default)]
    pub output_tokens: u32,
}

/// Response from the Messages API.
///
/// Every field except `content` is informational and defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub response_type: String,
    #[serde(default)]
    pub role: String,
    /// Content blocks in the response, in order.
    #[serde(default)]
    pub content: Vec<ResponseContentBlock>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    #[serde(default)]
    pub usage: AnthropicUsage,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_lifts_system_messages() {
        let messages = vec![
            Message::system("Be brief."),
            Message::system("Answer in French."),
            Message::user("Hello"),
            Message::assistant("Bonjour"),
        ];
        let request = CreateMessageRequest::new("claude", DEFAULT_MAX_TOKENS, &messages, &[]);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["system"], "Be brief.\nAnswer in French.");
        assert_eq!(body["max_tokens"], 1024);
        assert!(body.get("tools").is_none());
        assert_eq!(
            body["messages"],
            json!([
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Bonjour"}
            ])
        );
    }

    #[test]
    fn test_request_without_system_omits_field() {
        let request =
            CreateMessageRequest::new("claude", DEFAULT_MAX_TOKENS, &[Message::user("Hi")], &[]);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_non_assistant_roles_become_user() {
        let tool = Message::tool("{}", "call_1", "lookup").unwrap();
        let wire = AnthropicMessage::from(&tool);
        assert_eq!(wire.role, AnthropicRole::User);
    }

    #[test]
    fn test_block_content_passes_through() {
        let turn = Message::user_blocks(vec![ContentBlock::tool_result("toolu_1", "{\"ok\":true}")]);
        let wire = serde_json::to_value(AnthropicMessage::from(&turn)).unwrap();
        assert_eq!(
            wire,
            json!({
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": "{\"ok\":true}"}]
            })
        );
    }

    #[test]
    fn test_tools_keep_original_names() {
        let functions = vec![
            FunctionDefinition::builder()
                .name("get customer info".to_string())
                .build(),
        ];
        let request = CreateMessageRequest::new("claude", 512, &[Message::user("x")], &functions);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["tools"][0]["name"], "get customer info");
        assert_eq!(
            body["tools"][0]["input_schema"],
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn test_unknown_blocks_and_stop_reasons_deserialize() {
        let response: MessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "sig"},
                {"type": "text", "text": "Done."}
            ],
            "stop_reason": "pause_turn"
        }))
        .unwrap();

        assert_eq!(response.content[0], ResponseContentBlock::Unsupported);
        assert!(response.content[0].to_content_block().is_none());
        assert_eq!(
            response.content[1].to_content_block(),
            Some(ContentBlock::text("Done."))
        );
        assert_eq!(response.stop_reason, Some(StopReason::Other));
    }

    #[test]
    fn test_tool_use_without_input_resends_empty_object() {
        let response: MessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "tool_use", "id": "toolu_1", "name": "lookup"},
                {"type": "tool_use", "id": "toolu_2", "name": "lookup", "input": null}
            ]
        }))
        .unwrap();

        for block in &response.content {
            let resent = serde_json::to_value(block.to_content_block().unwrap()).unwrap();
            assert_eq!(resent["input"], json!({}));
        }
    }

    proptest! {
        #[test]
        fn fuzz_response_parsing(data in prop::collection::vec(any::<u8>(), 0..1000)) {
            let _ = serde_json::from_slice::<MessageResponse>(&data);
        }
    }
}

//! Transcript messages exchanged with an LLM provider.
//!
//! A transcript is an ordered list of [`Message`]s. Each message has a role and
//! content that is either plain text or an ordered sequence of
//! [`ContentBlock`]s. Block content is how tagged-block providers carry tool
//! requests (`tool_use`) and tool results (`tool_result`); flat-array
//! providers instead attach [`ToolCall`]s to assistant messages and answer them
//! with `tool` role messages.
//!
//! # Examples
//!
//! ```
//! use mockingbird_common::chat::{ContentBlock, Message, MessageRole};
//! use serde_json::json;
//!
//! let transcript = vec![
//!     Message::system("You are a helpful assistant."),
//!     Message::user("What's the weather in Tokyo?"),
//!     Message::assistant_blocks(vec![
//!         ContentBlock::text("Let me check."),
//!         ContentBlock::tool_use("toolu_1", "get_weather", json!({"city": "Tokyo"})),
//!     ]),
//!     Message::user_blocks(vec![ContentBlock::tool_result("toolu_1", r#"{"temp":18}"#)]),
//! ];
//!
//! assert_eq!(transcript[2].role, MessageRole::Assistant);
//! assert_eq!(transcript[2].content.text(), "Let me check.");
//! ```
//!
//! # Performance
//!
//! Tool calls are held in a `SmallVec` so the common case (at most two calls
//! per turn) does not allocate.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

use crate::tools::ToolCall;

/// Represents the role of a message sender in a transcript.
///
/// Roles serialize to the lowercase strings both providers use.
///
/// ```
/// use mockingbird_common::chat::MessageRole;
///
/// let json = serde_json::to_string(&MessageRole::Tool).unwrap();
/// assert_eq!(json, "\"tool\"");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions that set the assistant's behavior.
    System,
    /// Input from the person testing the assistant.
    User,
    /// Output from the model, possibly carrying tool requests.
    Assistant,
    /// The result of a tool call (flat-array providers only).
    Tool,
}

impl MessageRole {
    /// Returns the wire name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed content block, in the shape tagged-block providers use on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A request from the model to call a function.
    ToolUse {
        /// Provider-assigned call identifier.
        id: String,
        /// The function name as the model spelled it.
        name: String,
        /// Structured arguments.
        input: serde_json::Value,
    },
    /// The result of a previous `tool_use` block.
    ToolResult {
        /// Identifier of the originating `tool_use` block.
        tool_use_id: String,
        /// JSON-encoded result.
        content: String,
    },
}

impl ContentBlock {
    /// Creates a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a tool request block.
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Creates a tool result block.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        }
    }
}

/// Message content: plain text, or an ordered sequence of content blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Ordered content blocks.
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Returns the textual part of the content.
    ///
    /// For block content this is every text block joined with a blank line,
    /// in order. Non-text blocks contribute nothing.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    /// Returns true if the content holds no text and no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<ContentBlock>> for MessageContent {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::Blocks(blocks)
    }
}

// Providers and stored histories send `"content": null` for tool-only turns.
fn content_or_empty<'de, D>(deserializer: D) -> Result<MessageContent, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<MessageContent>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single message in a transcript.
///
/// # Creating Messages
///
/// ```
/// use mockingbird_common::chat::Message;
/// use mockingbird_common::tools::ToolCall;
///
/// let call = ToolCall::new("call_1", "lookup", serde_json::Map::new());
/// let assistant = Message::assistant("")
///     .with_tool_calls(vec![call])
///     .expect("assistant messages accept tool calls");
///
/// let result = Message::tool(r#"{"ok":true}"#, "call_1", "lookup")
///     .expect("valid tool message");
/// assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
/// # let _ = assistant;
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    /// The role of the sender.
    pub role: MessageRole,

    /// Text or block content. May be empty for tool-only assistant turns.
    #[serde(default, deserialize_with = "content_or_empty")]
    pub content: MessageContent,

    /// Tool calls requested by an assistant message on flat-array providers.
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub tool_calls: SmallVec<[ToolCall; 2]>,

    /// The call a `tool` message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// The function name a `tool` message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Creates a new message with the specified role and content.
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: SmallVec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Creates a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content.into())
    }

    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    /// Creates a user turn made of content blocks.
    #[must_use]
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::User, blocks)
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content.into())
    }

    /// Creates an assistant turn made of content blocks.
    #[must_use]
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::Assistant, blocks)
    }

    /// Creates a new tool result message.
    ///
    /// # Errors
    ///
    /// Returns an error if `tool_call_id` or `function_name` is empty.
    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        function_name: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let tool_call_id = tool_call_id.into();
        let function_name = function_name.into();
        if tool_call_id.is_empty() {
            anyhow::bail!("Tool call ID cannot be empty");
        }
        if function_name.is_empty() {
            anyhow::bail!("Function name cannot be empty for tool messages");
        }
        Ok(Self::tool_response(content, tool_call_id, function_name))
    }

    /// Creates a tool message answering a call exactly as the provider
    /// issued it. The id and name are echoed back even when empty.
    pub fn tool_response(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(MessageRole::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg.name = Some(function_name.into());
        msg
    }

    /// Sets the tool calls for this message.
    ///
    /// # Errors
    ///
    /// Returns an error if this message is not an assistant message.
    pub fn with_tool_calls(
        mut self,
        tool_calls: impl Into<SmallVec<[ToolCall; 2]>>,
    ) -> anyhow::Result<Self> {
        if self.role != MessageRole::Assistant {
            anyhow::bail!(
                "Tool calls can only be added to assistant messages, found {}",
                self.role
            );
        }
        self.tool_calls = tool_calls.into();
        Ok(self)
    }
}

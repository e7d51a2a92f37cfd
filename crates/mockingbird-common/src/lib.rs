//! # mockingbird-common
//!
//! Common types for exercising assistant instructions and mock function stubs
//! against real LLM providers.
//!
//! This crate provides the provider-agnostic data model shared by the rest of
//! the workspace:
//! - Transcript messages whose content is either plain text or an ordered
//!   sequence of content blocks
//! - Function stub definitions carrying their declared mock responses
//! - Normalized tool calls and tool results, and the conversation result
//!   produced by one driver run
//! - Provider identifiers and client configuration
//!
//! ## Example
//!
//! ```
//! use mockingbird_common::{FunctionDefinition, Message, ToolCall};
//! use serde_json::json;
//!
//! let system = Message::system("You are a currency assistant.");
//! let user = Message::user("How many VND is one GBP?");
//!
//! let function = FunctionDefinition::builder()
//!     .name("getExchangeRate".to_string())
//!     .mock_response(Some(json!({"rate": 31348.75})))
//!     .build();
//!
//! let call = ToolCall::new("call_1", "getExchangeRate", serde_json::Map::new());
//! assert_eq!(call.name(), function.name);
//! # let _ = (system, user);
//! ```

/// Transcript messages, roles and content blocks.
pub mod chat;
/// Provider identifiers and client configuration.
pub mod client;
/// Function stubs, tool calls, tool results and the conversation result.
pub mod tools;

pub use chat::{ContentBlock, Message, MessageContent, MessageRole};
pub use client::{Config, Provider, RetryConfig, UnknownProvider};
pub use tools::{
    Arguments, ConversationResult, Function, FunctionCall, FunctionDefinition, FunctionResult,
    Tool, ToolCall, ToolResult, empty_object_schema,
};

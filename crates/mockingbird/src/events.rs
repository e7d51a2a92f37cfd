//! Event types for the conversation driver
//!
//! Events are fire-and-forget notifications about what the driver is doing.
//! The driver never waits on or reacts to them, so a callback cannot change
//! the course of a conversation.

use mockingbird_common::Provider;
use mockingbird_common::tools::{ToolCall, ToolResult};

/// Events emitted by the driver during one conversation run
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// A provider call is about to be made.
    ProviderCall {
        /// Provider being called
        provider: Provider,
        /// Zero-based iteration index
        iteration: u32,
    },

    /// The model requested a tool call and its arguments were decoded.
    ToolCall(ToolCall),

    /// A mock result was produced for a tool call.
    ToolResult(ToolResult),
}

/// Callback receiving driver events
pub type EventCallback = Box<dyn Fn(&DriverEvent) + Send + Sync>;

//! Provider adapters.
//!
//! An adapter reconciles one provider's tool-calling protocol with the
//! provider-agnostic loop in [`ConversationDriver`](crate::ConversationDriver):
//! it reads a raw response into an [`AssistantTurn`], writes that turn back
//! into the transcript, and shapes tool results the way the provider expects
//! them on the next call.

use mockingbird_client::ProviderResponse;
use mockingbird_common::chat::{ContentBlock, Message};
use mockingbird_common::tools::{ToolCall, ToolResult};
use mockingbird_common::Provider;

use crate::error::CoreError;

mod anthropic;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAIAdapter;

/// One assistant response, normalized across providers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    /// The text of the response. Empty when the model only requested tools.
    pub text: String,
    /// Tool calls the model requested, in the order it emitted them.
    pub tool_calls: Vec<ToolCall>,
    /// The response blocks in their original order, for block-based providers.
    pub blocks: Vec<ContentBlock>,
}

impl AssistantTurn {
    /// A turn with no tool calls is the final answer.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Translation between a provider's payloads and the driver's loop.
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter speaks for.
    fn provider(&self) -> Provider;

    /// Reads the final text and pending tool calls from a raw response.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedResponse`] when the response has no
    /// usable choice or content, or speaks another provider's protocol.
    fn extract(&self, response: ProviderResponse) -> Result<AssistantTurn, CoreError>;

    /// The assistant message carrying `turn`'s tool calls into the transcript.
    fn assistant_turn(&self, turn: &AssistantTurn) -> Message;

    /// The message(s) answering one turn's tool calls, in call order.
    fn tool_results_turn(&self, results: &[ToolResult]) -> Vec<Message>;
}

static OPENAI: OpenAIAdapter = OpenAIAdapter;
static ANTHROPIC: AnthropicAdapter = AnthropicAdapter;

/// Returns the adapter for `provider`.
#[must_use]
pub fn for_provider(provider: Provider) -> &'static dyn ProviderAdapter {
    match provider {
        Provider::OpenAI => &OPENAI,
        Provider::Anthropic => &ANTHROPIC,
    }
}

fn mismatched(expected: Provider, response: &ProviderResponse) -> CoreError {
    CoreError::MalformedResponse(format!(
        "expected a {} response, got {}",
        expected.display_name(),
        response.provider().display_name()
    ))
}

use log::debug;

use mockingbird_client::ProviderResponse;
use mockingbird_client::anthropic::ResponseContentBlock;
use mockingbird_common::chat::{ContentBlock, Message};
use mockingbird_common::tools::{ToolCall, ToolResult};
use mockingbird_common::Provider;

use super::{AssistantTurn, ProviderAdapter, mismatched};
use crate::error::CoreError;

/// Tagged content blocks with structured arguments, answered by a single
/// user turn of `tool_result` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn extract(&self, response: ProviderResponse) -> Result<AssistantTurn, CoreError> {
        let response = match response {
            ProviderResponse::Anthropic(response) => response,
            other => return Err(mismatched(Provider::Anthropic, &other)),
        };

        if response.content.is_empty() {
            return Err(CoreError::MalformedResponse(
                "Anthropic response has no content".to_string(),
            ));
        }

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for block in &response.content {
            match block {
                ResponseContentBlock::Text { text } => texts.push(text.as_str()),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::from_structured(id.clone(), name.clone(), input.clone()));
                }
                ResponseContentBlock::Unsupported => {}
            }
        }

        debug!(
            "Anthropic turn: stop_reason={:?}, blocks={}, tool_calls={}",
            response.stop_reason,
            response.content.len(),
            tool_calls.len()
        );

        Ok(AssistantTurn {
            text: texts.join("\n\n"),
            tool_calls,
            blocks: response
                .content
                .iter()
                .filter_map(ResponseContentBlock::to_content_block)
                .collect(),
        })
    }

    fn assistant_turn(&self, turn: &AssistantTurn) -> Message {
        Message::assistant_blocks(turn.blocks.clone())
    }

    fn tool_results_turn(&self, results: &[ToolResult]) -> Vec<Message> {
        let blocks = results
            .iter()
            .map(|result| ContentBlock::tool_result(result.id.clone(), result.result_json()))
            .collect();
        vec![Message::user_blocks(blocks)]
    }
}

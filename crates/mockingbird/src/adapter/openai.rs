use log::debug;

use mockingbird_client::ProviderResponse;
use mockingbird_common::chat::Message;
use mockingbird_common::tools::{ToolCall, ToolResult};
use mockingbird_common::Provider;

use super::{AssistantTurn, ProviderAdapter, mismatched};
use crate::error::CoreError;

/// Flat tool-call arrays with string-encoded arguments, answered by one
/// `tool` message per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAIAdapter;

impl ProviderAdapter for OpenAIAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn extract(&self, response: ProviderResponse) -> Result<AssistantTurn, CoreError> {
        let response = match response {
            ProviderResponse::OpenAI(response) => response,
            other => return Err(mismatched(Provider::OpenAI, &other)),
        };

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::MalformedResponse("OpenAI response has no choices".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall::from_encoded(call.id, call.function.name, &call.function.arguments))
            .collect();

        debug!(
            "OpenAI turn: finish_reason={:?}, tool_calls={}",
            choice.finish_reason,
            tool_calls.len()
        );

        Ok(AssistantTurn {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            blocks: Vec::new(),
        })
    }

    fn assistant_turn(&self, turn: &AssistantTurn) -> Message {
        let mut message = Message::assistant(turn.text.clone());
        message.tool_calls = turn.tool_calls.iter().cloned().collect();
        message
    }

    fn tool_results_turn(&self, results: &[ToolResult]) -> Vec<Message> {
        results
            .iter()
            .map(|result| {
                Message::tool_response(
                    result.result_json(),
                    result.id.clone(),
                    result.function.name.clone(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use mockingbird_client::{ChatCompletionResponse, MessageResponse};
    use mockingbird_common::chat::MessageRole;
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> ProviderResponse {
        serde_json::from_value::<ChatCompletionResponse>(value)
            .unwrap()
            .into()
    }

    #[test]
    fn test_extracts_text_and_decoded_calls() {
        let turn = OpenAIAdapter
            .extract(response(json!({
                "choices": [{
                    "message": {
                        "content": "Let me fetch that.",
                        "tool_calls": [
                            {"id": "call_1", "function": {"name": "a", "arguments": "{\"x\":1}"}},
                            {"id": "call_2", "function": {"name": "b", "arguments": "oops"}}
                        ]
                    }
                }]
            })))
            .unwrap();

        assert_eq!(turn.text, "Let me fetch that.");
        assert_eq!(turn.tool_calls.len(), 2);
        assert_eq!(turn.tool_calls[0].function.arguments.get("x"), Some(&json!(1)));
        assert!(turn.tool_calls[1].function.arguments.is_empty());
        assert!(!turn.is_final());
    }

    #[test]
    fn test_missing_choice_is_malformed() {
        let err = OpenAIAdapter.extract(response(json!({"choices": []}))).unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse(_)));
    }

    #[test]
    fn test_foreign_response_is_malformed() {
        let err = OpenAIAdapter
            .extract(MessageResponse::default().into())
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse(_)));
    }

    #[test]
    fn test_null_content_is_empty_text() {
        let turn = OpenAIAdapter
            .extract(response(json!({"choices": [{"message": {"content": null}}]})))
            .unwrap();
        assert_eq!(turn.text, "");
        assert!(turn.is_final());
    }

    #[test]
    fn test_one_tool_message_per_result() {
        let first = ToolCall::from_encoded("call_1", "a", "{}");
        let second = ToolCall::from_encoded("call_2", "b", "{}");
        let results = vec![
            ToolResult::for_call(&first, json!({"rate": 31348.75})),
            ToolResult::for_call(&second, json!("ok")),
        ];

        let messages = OpenAIAdapter.tool_results_turn(&results);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.role == MessageRole::Tool));
        assert_eq!(messages[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[0].content.text(), r#"{"rate":31348.75}"#);
        assert_eq!(messages[1].name.as_deref(), Some("b"));
        assert_eq!(messages[1].content.text(), r#""ok""#);
    }

    #[test]
    fn test_tool_message_for_unnamed_call() {
        let call = ToolCall::from_encoded("", "", "{}");
        let results = vec![ToolResult::for_call(&call, json!({"result": "Function executed successfully"}))];

        let messages = OpenAIAdapter.tool_results_turn(&results);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].tool_call_id.as_deref(), Some(""));
        assert_eq!(messages[0].name.as_deref(), Some(""));
    }

    #[test]
    fn test_assistant_turn_carries_calls() {
        let turn = AssistantTurn {
            text: String::new(),
            tool_calls: vec![ToolCall::from_encoded("call_1", "a", r#"{"q":"x"}"#)],
            blocks: Vec::new(),
        };
        let message = OpenAIAdapter.assistant_turn(&turn);

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].arguments_json(), r#"{"q":"x"}"#);
    }
}

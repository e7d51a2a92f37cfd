use std::time::Instant;

use log::{debug, info};

use mockingbird_client::AiCaller;
use mockingbird_common::Provider;
use mockingbird_common::chat::Message;
use mockingbird_common::tools::{ConversationResult, ToolResult};
use mockingbird_tools::FunctionRegistry;

use crate::adapter;
use crate::error::CoreError;
use crate::events::{DriverEvent, EventCallback};

/// Provider round-trips allowed when none is configured.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Drives one conversation with a provider until it produces a final answer.
///
/// Every tool call the model makes is answered from the [`FunctionRegistry`]
/// with the stub's mock result, and the exchange continues. The number of
/// provider calls is capped by `max_iterations`.
///
/// The driver holds no per-conversation state; one instance can serve many
/// concurrent runs.
pub struct ConversationDriver<C: AiCaller> {
    pub caller: C,
    pub max_iterations: u32,
    /// Optional observer for provider calls, tool calls and results
    pub event_callback: Option<EventCallback>,
}

impl<C: AiCaller> ConversationDriver<C> {
    pub const fn new(caller: C) -> Self {
        Self {
            caller,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            event_callback: None,
        }
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_event_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DriverEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(Box::new(callback));
        self
    }

    fn emit(&self, event: DriverEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(&event);
        }
    }

    /// Runs the conversation until the model answers without tool calls.
    ///
    /// `registry` is the snapshot of function stubs offered to the model and
    /// used to answer its tool calls. `model` overrides the provider default.
    ///
    /// # Errors
    ///
    /// - [`CoreError::IterationLimitExceeded`] when no final answer arrives
    ///   within `max_iterations` provider calls
    /// - [`CoreError::MalformedResponse`] when a response has no usable content
    /// - [`CoreError::Client`] when the provider call itself fails
    pub async fn run(
        &self,
        provider: Provider,
        initial_messages: &[Message],
        registry: &FunctionRegistry,
        model: Option<&str>,
    ) -> Result<ConversationResult, CoreError> {
        let adapter = adapter::for_provider(provider);
        let start_time = Instant::now();

        let mut transcript = initial_messages.to_vec();
        let mut result = ConversationResult::default();

        for iteration in 0..self.max_iterations {
            info!(
                "Calling {} ({}/{})",
                provider.display_name(),
                iteration + 1,
                self.max_iterations
            );
            self.emit(DriverEvent::ProviderCall {
                provider,
                iteration,
            });

            let response = self
                .caller
                .invoke(provider, &transcript, registry.definitions(), model)
                .await?;
            let turn = adapter.extract(response)?;

            if turn.is_final() {
                debug!(
                    "Final answer after {} provider call(s) ({:.2?})",
                    iteration + 1,
                    start_time.elapsed()
                );
                result.assistant_message = turn.text;
                return Ok(result);
            }

            transcript.push(adapter.assistant_turn(&turn));

            let mut results: Vec<ToolResult> = Vec::with_capacity(turn.tool_calls.len());
            for call in turn.tool_calls {
                debug!("Tool call {} ({}): {:?}", call.name(), call.id, call.function.arguments);
                self.emit(DriverEvent::ToolCall(call.clone()));

                let tool_result = registry.execute(&call);
                self.emit(DriverEvent::ToolResult(tool_result.clone()));

                result.function_calls.push(call);
                results.push(tool_result);
            }

            transcript.extend(adapter.tool_results_turn(&results));
            result.function_results.extend(results);
        }

        Err(CoreError::IterationLimitExceeded {
            provider,
            limit: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use mockingbird_client::{
        ChatCompletionResponse, ClientError, MessageResponse, ProviderResponse,
    };
    use mockingbird_common::chat::{ContentBlock, MessageContent, MessageRole};
    use mockingbird_common::tools::FunctionDefinition;
    use serde_json::json;

    use super::*;

    /// Replays canned responses in order and records every transcript it sees.
    #[derive(Default)]
    struct ScriptedCaller {
        responses: Mutex<VecDeque<ProviderResponse>>,
        repeat: Option<ProviderResponse>,
        calls: AtomicUsize,
        transcripts: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedCaller {
        fn new(responses: Vec<ProviderResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn repeating(response: ProviderResponse) -> Self {
            Self {
                repeat: Some(response),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn transcript(&self, index: usize) -> Vec<Message> {
            self.transcripts.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl AiCaller for ScriptedCaller {
        async fn invoke(
            &self,
            _provider: Provider,
            messages: &[Message],
            _functions: &[FunctionDefinition],
            _model: Option<&str>,
        ) -> Result<ProviderResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.transcripts.lock().unwrap().push(messages.to_vec());
            if let Some(ref response) = self.repeat {
                return Ok(response.clone());
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ClientError::InvalidResponse("No more mock responses available".to_string()))
        }
    }

    fn openai(value: serde_json::Value) -> ProviderResponse {
        serde_json::from_value::<ChatCompletionResponse>(value)
            .unwrap()
            .into()
    }

    fn anthropic(value: serde_json::Value) -> ProviderResponse {
        serde_json::from_value::<MessageResponse>(value).unwrap().into()
    }

    fn base_messages() -> Vec<Message> {
        vec![Message::system("Be helpful"), Message::user("Hello")]
    }

    fn exchange_rate_registry() -> FunctionRegistry {
        FunctionRegistry::new(vec![
            FunctionDefinition::builder()
                .name("getExchangeRate".to_string())
                .mock_response(Some(json!({"rate": 31348.75})))
                .build(),
        ])
    }

    fn exchange_rate_script() -> Vec<ProviderResponse> {
        vec![
            openai(json!({
                "choices": [{
                    "message": {
                        "content": "Let me fetch that.",
                        "tool_calls": [{
                            "id": "call_1",
                            "function": {
                                "name": "getExchangeRate",
                                "arguments": "{\"baseCurrency\":\"GBP\",\"targetCurrency\":\"VND\"}"
                            }
                        }]
                    }
                }]
            })),
            openai(json!({
                "choices": [{"message": {"content": "1 GBP equals 31,348.75 VND.", "tool_calls": []}}]
            })),
        ]
    }

    #[tokio::test]
    async fn test_returns_immediately_without_tool_calls() {
        let caller = ScriptedCaller::new(vec![openai(json!({
            "choices": [{"message": {"content": "Hi there!", "tool_calls": []}}]
        }))]);
        let driver = ConversationDriver::new(caller);

        let result = driver
            .run(Provider::OpenAI, &base_messages(), &FunctionRegistry::default(), Some("gpt-4"))
            .await
            .unwrap();

        assert_eq!(result.assistant_message, "Hi there!");
        assert!(result.function_calls.is_empty());
        assert!(result.function_results.is_empty());
        assert_eq!(driver.caller.calls(), 1);
    }

    #[tokio::test]
    async fn test_executes_tool_calls_until_final_answer() {
        let driver = ConversationDriver::new(ScriptedCaller::new(exchange_rate_script()));

        let result = driver
            .run(Provider::OpenAI, &base_messages(), &exchange_rate_registry(), Some("gpt-4-turbo"))
            .await
            .unwrap();

        assert_eq!(result.assistant_message, "1 GBP equals 31,348.75 VND.");
        assert_eq!(result.function_calls.len(), 1);
        assert_eq!(
            serde_json::Value::Object(result.function_calls[0].function.arguments.clone()),
            json!({"baseCurrency": "GBP", "targetCurrency": "VND"})
        );
        assert_eq!(result.function_results.len(), 1);
        assert_eq!(result.function_results[0].id, "call_1");
        assert_eq!(result.function_results[0].function.result, json!({"rate": 31348.75}));

        // Second call sees the assistant turn and one tool message appended.
        let second = driver.caller.transcript(1);
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, MessageRole::Assistant);
        assert_eq!(second[2].tool_calls[0].id, "call_1");
        assert_eq!(second[3].role, MessageRole::Tool);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(second[3].content.text(), r#"{"rate":31348.75}"#);
    }

    #[tokio::test]
    async fn test_stops_after_max_iterations() {
        let caller = ScriptedCaller::repeating(openai(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "id": "call_loop",
                        "function": {"name": "getCustomerContext", "arguments": "{\"customer_id\":\"123\"}"}
                    }]
                }
            }]
        })));
        let registry = FunctionRegistry::new(vec![
            FunctionDefinition::builder()
                .name("getCustomerContext".to_string())
                .mock_response(Some(json!({"customer_id": "123"})))
                .build(),
        ]);
        let driver = ConversationDriver::new(caller).with_max_iterations(2);

        let err = driver
            .run(Provider::OpenAI, &base_messages(), &registry, Some("gpt-4o"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Exceeded OpenAI tool-call iteration limit"));
        assert_eq!(driver.caller.calls(), 2);
    }

    #[tokio::test]
    async fn test_resolves_sanitized_names() {
        let caller = ScriptedCaller::new(vec![
            openai(json!({
                "choices": [{"message": {"tool_calls": [{
                    "id": "call_1",
                    "function": {"name": "get_customer_info", "arguments": "{}"}
                }]}}]
            })),
            openai(json!({"choices": [{"message": {"content": "Gold tier."}}]})),
        ]);
        let registry = FunctionRegistry::new(vec![
            FunctionDefinition::builder()
                .name("get customer info".to_string())
                .mock_response(Some(json!({"tier": "gold"})))
                .build(),
        ]);

        let result = ConversationDriver::new(caller)
            .run(Provider::OpenAI, &base_messages(), &registry, None)
            .await
            .unwrap();

        assert_eq!(result.function_results[0].function.result, json!({"tier": "gold"}));
    }

    #[tokio::test]
    async fn test_unparseable_arguments_do_not_abort() {
        let caller = ScriptedCaller::new(vec![
            openai(json!({
                "choices": [{"message": {"tool_calls": [{
                    "id": "call_1",
                    "function": {"name": "getExchangeRate", "arguments": "{baseCurrency: GBP"}
                }]}}]
            })),
            openai(json!({"choices": [{"message": {"content": "Done."}}]})),
        ]);

        let result = ConversationDriver::new(caller)
            .run(Provider::OpenAI, &base_messages(), &exchange_rate_registry(), None)
            .await
            .unwrap();

        assert_eq!(result.assistant_message, "Done.");
        assert!(result.function_calls[0].function.arguments.is_empty());
    }

    #[tokio::test]
    async fn test_unnamed_tool_call_gets_generic_result() {
        let caller = ScriptedCaller::new(vec![
            openai(json!({
                "choices": [{"message": {"tool_calls": [{
                    "id": "call_1",
                    "function": {"name": "", "arguments": "{}"}
                }]}}]
            })),
            openai(json!({"choices": [{"message": {"content": "done"}}]})),
        ]);
        let driver = ConversationDriver::new(caller);

        let result = driver
            .run(Provider::OpenAI, &base_messages(), &exchange_rate_registry(), None)
            .await
            .unwrap();

        assert_eq!(result.assistant_message, "done");
        assert_eq!(
            result.function_results[0].function.result,
            json!({"result": "Function executed successfully"})
        );
        assert_eq!(driver.caller.calls(), 2);

        let second = driver.caller.transcript(1);
        assert_eq!(second[3].role, MessageRole::Tool);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn test_accumulates_across_tool_rounds() {
        let caller = ScriptedCaller::new(vec![
            openai(json!({
                "choices": [{"message": {"tool_calls": [{
                    "id": "call_1",
                    "function": {"name": "getExchangeRate", "arguments": "{\"baseCurrency\":\"GBP\"}"}
                }]}}]
            })),
            openai(json!({
                "choices": [{"message": {"tool_calls": [
                    {"id": "call_2", "function": {"name": "getExchangeRate", "arguments": "{\"baseCurrency\":\"EUR\"}"}},
                    {"id": "call_3", "function": {"name": "convertAmount", "arguments": "{}"}}
                ]}}]
            })),
            openai(json!({"choices": [{"message": {"content": "Both rates fetched."}}]})),
        ]);
        let driver = ConversationDriver::new(caller);

        let result = driver
            .run(Provider::OpenAI, &base_messages(), &exchange_rate_registry(), None)
            .await
            .unwrap();

        assert_eq!(result.assistant_message, "Both rates fetched.");
        let call_ids: Vec<&str> = result.function_calls.iter().map(|c| c.id.as_str()).collect();
        let result_ids: Vec<&str> = result.function_results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(call_ids, ["call_1", "call_2", "call_3"]);
        assert_eq!(result_ids, ["call_1", "call_2", "call_3"]);
        assert_eq!(
            result.function_results[2].function.result,
            json!({"result": "Function executed successfully"})
        );
        assert_eq!(driver.caller.calls(), 3);

        // system, user, then assistant + tool for round one, assistant + two tools for round two
        let third = driver.caller.transcript(2);
        let roles: Vec<MessageRole> = third.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Tool,
            ]
        );
        assert_eq!(third[2].tool_calls[0].id, "call_1");
        assert_eq!(third[4].tool_calls.len(), 2);
        assert_eq!(third[6].tool_call_id.as_deref(), Some("call_3"));
    }

    #[tokio::test]
    async fn test_identical_runs_produce_identical_results() {
        let first = ConversationDriver::new(ScriptedCaller::new(exchange_rate_script()))
            .run(Provider::OpenAI, &base_messages(), &exchange_rate_registry(), None)
            .await
            .unwrap();
        let second = ConversationDriver::new(ScriptedCaller::new(exchange_rate_script()))
            .run(Provider::OpenAI, &base_messages(), &exchange_rate_registry(), None)
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_anthropic_results_share_one_user_turn() {
        let caller = ScriptedCaller::new(vec![
            anthropic(json!({
                "content": [
                    {"type": "text", "text": "Checking both."},
                    {"type": "tool_use", "id": "toolu_1", "name": "getExchangeRate", "input": {"baseCurrency": "GBP"}},
                    {"type": "tool_use", "id": "toolu_2", "name": "unknownFunction", "input": {}}
                ]
            })),
            anthropic(json!({
                "content": [{"type": "text", "text": "Rate found."}, {"type": "text", "text": "Anything else?"}]
            })),
        ]);
        let driver = ConversationDriver::new(caller);

        let result = driver
            .run(Provider::Anthropic, &base_messages(), &exchange_rate_registry(), None)
            .await
            .unwrap();

        assert_eq!(result.assistant_message, "Rate found.\n\nAnything else?");
        assert_eq!(result.function_calls.len(), 2);
        assert_eq!(
            result.function_results[1].function.result,
            json!({"result": "Function executed successfully"})
        );

        let second = driver.caller.transcript(1);
        assert_eq!(second.len(), 4);
        assert_eq!(second[3].role, MessageRole::User);
        assert_eq!(
            second[3].content,
            MessageContent::Blocks(vec![
                ContentBlock::tool_result("toolu_1", r#"{"rate":31348.75}"#),
                ContentBlock::tool_result("toolu_2", r#"{"result":"Function executed successfully"}"#),
            ])
        );
    }

    #[tokio::test]
    async fn test_malformed_response_fails() {
        let caller = ScriptedCaller::new(vec![openai(json!({"choices": []}))]);

        let err = ConversationDriver::new(caller)
            .run(Provider::OpenAI, &base_messages(), &FunctionRegistry::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_events_follow_the_exchange() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let driver = ConversationDriver::new(ScriptedCaller::new(exchange_rate_script()))
            .with_event_callback(move |event| {
                let label = match event {
                    DriverEvent::ProviderCall { iteration, .. } => format!("call:{iteration}"),
                    DriverEvent::ToolCall(call) => format!("tool:{}", call.name()),
                    DriverEvent::ToolResult(result) => format!("result:{}", result.id),
                };
                sink.lock().unwrap().push(label);
            });

        driver
            .run(Provider::OpenAI, &base_messages(), &exchange_rate_registry(), None)
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["call:0", "tool:getExchangeRate", "result:call_1", "call:1"]
        );
    }
}

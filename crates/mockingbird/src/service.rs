//! The request/reply contract around one conversation run.
//!
//! [`ConversationService`] validates a [`ConversationRequest`], assembles the
//! transcript from the session's instructions and history, runs the
//! [`ConversationDriver`] and shapes the outcome as a [`ConversationReply`] or
//! an [`ErrorReply`] with its HTTP status.

use log::{error, info};
use serde::{Deserialize, Serialize};

use mockingbird_client::AiCaller;
use mockingbird_common::Provider;
use mockingbird_common::chat::Message;
use mockingbird_common::tools::{ToolCall, ToolResult};
use mockingbird_tools::FunctionRegistry;

use crate::core::ConversationDriver;
use crate::error::CoreError;

/// Error code for a provider with no API key.
pub const API_KEY_NOT_CONFIGURED: &str = "API_KEY_NOT_CONFIGURED";

/// Model name reported when the request named none.
pub const DEFAULT_MODEL_LABEL: &str = "default";

/// One user message sent into a session's conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Prior turns, in provider message shape.
    #[serde(default)]
    pub conversation_history: Vec<Message>,
}

impl ConversationRequest {
    pub fn new(message: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            provider: provider.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.conversation_history = history;
        self
    }

    /// Checks the request and resolves its provider.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRequest`] for a missing message or
    /// provider, and [`CoreError::UnsupportedProvider`] for an unknown one.
    pub fn validate(&self) -> Result<Provider, CoreError> {
        if self.message.is_empty() {
            return Err(CoreError::InvalidRequest("Message is required".to_string()));
        }
        if self.provider.trim().is_empty() {
            return Err(CoreError::InvalidRequest("Provider is required".to_string()));
        }
        self.provider
            .parse()
            .map_err(|_| CoreError::UnsupportedProvider(self.provider.clone()))
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Assembles the transcript for a request.
///
/// The instructions become a system message only when they hold more than
/// whitespace. History follows, then the new user message.
#[must_use]
pub fn build_messages(instructions: Option<&str>, history: &[Message], message: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(content) = instructions
        && !content.trim().is_empty()
    {
        messages.push(Message::system(content));
    }
    messages.extend_from_slice(history);
    messages.push(Message::user(message));
    messages
}

/// A successful conversation reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReply {
    pub message: String,
    pub function_calls: Vec<ToolCall>,
    pub function_results: Vec<ToolResult>,
    /// The provider exactly as the request named it.
    pub provider: String,
    pub model: String,
}

/// A failed conversation, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorReply {
    /// Maps an error to its reply and HTTP status.
    ///
    /// Request problems are 400s, a missing API key is a 400 carrying
    /// [`API_KEY_NOT_CONFIGURED`], and everything else is a 500.
    #[must_use]
    pub fn from_error(err: &CoreError) -> (u16, Self) {
        match err {
            CoreError::InvalidRequest(_) | CoreError::UnsupportedProvider(_) => (
                400,
                Self {
                    error: err.to_string(),
                    code: None,
                    details: None,
                },
            ),
            e if e.is_credentials_missing() => (
                400,
                Self {
                    error: e.to_string(),
                    code: Some(API_KEY_NOT_CONFIGURED.to_string()),
                    details: None,
                },
            ),
            e => (
                500,
                Self {
                    error: "Failed to get AI response".to_string(),
                    code: None,
                    details: Some(e.to_string()),
                },
            ),
        }
    }
}

/// Runs conversation requests against a session's instructions and stubs.
pub struct ConversationService<C: AiCaller> {
    driver: ConversationDriver<C>,
}

impl<C: AiCaller> ConversationService<C> {
    pub const fn new(driver: ConversationDriver<C>) -> Self {
        Self { driver }
    }

    pub const fn driver(&self) -> &ConversationDriver<C> {
        &self.driver
    }

    /// Validates `request`, runs it, and shapes the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the conversation run fails.
    pub async fn converse(
        &self,
        request: &ConversationRequest,
        instructions: Option<&str>,
        registry: &FunctionRegistry,
    ) -> Result<ConversationReply, CoreError> {
        let provider = request.validate()?;
        let messages = build_messages(instructions, &request.conversation_history, &request.message);

        info!(
            "Conversation with {} ({} messages, {} functions)",
            provider.display_name(),
            messages.len(),
            registry.len()
        );

        let result = self
            .driver
            .run(provider, &messages, registry, request.model())
            .await?;

        Ok(ConversationReply {
            message: result.assistant_message,
            function_calls: result.function_calls,
            function_results: result.function_results,
            provider: request.provider.clone(),
            model: request
                .model()
                .map_or_else(|| DEFAULT_MODEL_LABEL.to_string(), str::to_string),
        })
    }

    /// Like [`converse`](Self::converse), with failures mapped to an
    /// [`ErrorReply`] and HTTP status.
    ///
    /// # Errors
    ///
    /// Returns the status and error reply when the conversation fails.
    pub async fn respond(
        &self,
        request: &ConversationRequest,
        instructions: Option<&str>,
        registry: &FunctionRegistry,
    ) -> Result<ConversationReply, (u16, ErrorReply)> {
        self.converse(request, instructions, registry)
            .await
            .map_err(|e| {
                error!("Error in conversation: {e}");
                ErrorReply::from_error(&e)
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use async_trait::async_trait;
    use mockingbird_client::{ChatCompletionResponse, ClientError, ProviderResponse};
    use mockingbird_common::chat::MessageRole;
    use mockingbird_common::tools::FunctionDefinition;
    use serde_json::json;

    use super::*;

    struct FixedCaller(Result<serde_json::Value, fn() -> ClientError>);

    #[async_trait]
    impl AiCaller for FixedCaller {
        async fn invoke(
            &self,
            _provider: Provider,
            _messages: &[Message],
            _functions: &[FunctionDefinition],
            _model: Option<&str>,
        ) -> Result<ProviderResponse, ClientError> {
            match &self.0 {
                Ok(body) => Ok(serde_json::from_value::<ChatCompletionResponse>(body.clone())
                    .unwrap()
                    .into()),
                Err(make) => Err(make()),
            }
        }
    }

    fn service(caller: FixedCaller) -> ConversationService<FixedCaller> {
        ConversationService::new(ConversationDriver::new(caller))
    }

    fn answering(text: &str) -> FixedCaller {
        FixedCaller(Ok(json!({"choices": [{"message": {"content": text}}]})))
    }

    #[test]
    fn test_validation_messages() {
        let err = ConversationRequest::new("", "openai").validate().unwrap_err();
        assert_eq!(err.to_string(), "Message is required");

        let err = ConversationRequest::new("Hi", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "Provider is required");

        let err = ConversationRequest::new("Hi", "gemini").validate().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported provider: gemini");

        let provider = ConversationRequest::new("Hi", "Anthropic").validate().unwrap();
        assert_eq!(provider, Provider::Anthropic);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: ConversationRequest = serde_json::from_value(json!({
            "message": "Hi",
            "provider": "openai",
            "conversationHistory": [{"role": "user", "content": "Earlier"}]
        }))
        .unwrap();

        assert_eq!(request.conversation_history.len(), 1);
        assert!(request.model.is_none());
    }

    #[test]
    fn test_build_messages_skips_blank_instructions() {
        let history = vec![Message::user("Earlier"), Message::assistant("Reply")];

        let messages = build_messages(Some("  \n"), &history, "Now");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, MessageRole::User);

        let messages = build_messages(Some("Be brief."), &history, "Now");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[3].content.text(), "Now");

        assert_eq!(build_messages(None, &[], "Now").len(), 1);
    }

    #[tokio::test]
    async fn test_reply_echoes_provider_and_default_model() {
        let reply = service(answering("Hi there!"))
            .converse(
                &ConversationRequest::new("Hello", "OpenAI"),
                Some("Be helpful"),
                &FunctionRegistry::default(),
            )
            .await
            .unwrap();

        assert_eq!(reply.message, "Hi there!");
        assert_eq!(reply.provider, "OpenAI");
        assert_eq!(reply.model, "default");

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["functionCalls"], json!([]));
        assert_eq!(value["functionResults"], json!([]));
    }

    #[tokio::test]
    async fn test_reply_reports_requested_model() {
        let reply = service(answering("ok"))
            .converse(
                &ConversationRequest::new("Hello", "openai").with_model("gpt-4o"),
                None,
                &FunctionRegistry::default(),
            )
            .await
            .unwrap();

        assert_eq!(reply.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_missing_key_maps_to_error_code() {
        let caller = FixedCaller(Err(|| ClientError::CredentialsMissing {
            provider: "openai".to_string(),
        }));

        let (status, reply) = service(caller)
            .respond(
                &ConversationRequest::new("Hello", "openai"),
                None,
                &FunctionRegistry::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(status, 400);
        assert_eq!(reply.error, "API key not configured for openai");
        assert_eq!(reply.code.as_deref(), Some(API_KEY_NOT_CONFIGURED));
    }

    #[tokio::test]
    async fn test_other_failures_map_to_generic_error() {
        let caller = FixedCaller(Err(|| ClientError::ServiceUnavailable("down".to_string())));

        let (status, reply) = service(caller)
            .respond(
                &ConversationRequest::new("Hello", "openai"),
                None,
                &FunctionRegistry::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(status, 500);
        assert_eq!(reply.error, "Failed to get AI response");
        assert_eq!(reply.details.as_deref(), Some("Service unavailable: down"));
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_calling() {
        let (status, reply) = service(answering("unused"))
            .respond(
                &ConversationRequest::new("", "openai"),
                None,
                &FunctionRegistry::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(status, 400);
        assert_eq!(reply.error, "Message is required");
        assert!(reply.code.is_none());
    }
}

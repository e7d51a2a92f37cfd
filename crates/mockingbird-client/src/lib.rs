//! # mockingbird-client
//!
//! Provider gateway for Mockingbird conversations.
//!
//! This crate owns everything between a transcript and a provider's HTTP API:
//! - [`AiCaller`]: the injected seam the conversation driver calls once per turn
//! - [`ProviderResponse`]: the raw response, tagged by the protocol it speaks
//! - [`ProviderGateway`]: the production [`AiCaller`], resolving keys through a
//!   [`KeySource`] and retrying transient failures
//! - [`OpenAIClient`] / [`AnthropicClient`]: the two wire protocols
//!
//! ## Example
//!
//! ```no_run
//! use mockingbird_client::{AiCaller, EnvKeys, ProviderGateway};
//! use mockingbird_common::{Message, Provider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let gateway = ProviderGateway::new(EnvKeys);
//! let messages = vec![Message::user("Hello!")];
//!
//! let response = gateway
//!     .invoke(Provider::Anthropic, &messages, &[], None)
//!     .await?;
//! println!("{response:?}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_retry_after::RetryAfterMiddleware;
use secrecy::SecretString;

use mockingbird_common::{Config, FunctionDefinition, Message, Provider};

pub mod anthropic;
pub mod error;
mod gateway;
pub mod openai;

pub use anthropic::{AnthropicClient, MessageResponse};
pub use error::ClientError;
pub use gateway::{EnvKeys, ProviderGateway};
pub use openai::{ChatCompletionResponse, OpenAIClient};

/// A raw provider response, tagged by protocol.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// Chat completion with a flat tool-call array.
    OpenAI(ChatCompletionResponse),
    /// Message made of tagged content blocks.
    Anthropic(MessageResponse),
}

impl ProviderResponse {
    /// The provider whose protocol this response speaks.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::OpenAI(_) => Provider::OpenAI,
            Self::Anthropic(_) => Provider::Anthropic,
        }
    }
}

impl From<ChatCompletionResponse> for ProviderResponse {
    fn from(response: ChatCompletionResponse) -> Self {
        Self::OpenAI(response)
    }
}

impl From<MessageResponse> for ProviderResponse {
    fn from(response: MessageResponse) -> Self {
        Self::Anthropic(response)
    }
}

/// Sends one transcript to a provider and returns its raw response.
///
/// The conversation driver takes this as an injected dependency so it can be
/// exercised with scripted responses.
#[async_trait]
pub trait AiCaller: Send + Sync {
    /// Call `provider` with the transcript and the declared function stubs.
    ///
    /// `model` overrides the provider's configured default model.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CredentialsMissing`] when no key is available,
    /// and transport or API errors otherwise.
    async fn invoke(
        &self,
        provider: Provider,
        messages: &[Message],
        functions: &[FunctionDefinition],
        model: Option<&str>,
    ) -> Result<ProviderResponse, ClientError>;
}

/// Supplies the API key for a provider.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Returns the key for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CredentialsMissing`] when no key is configured.
    async fn api_key(&self, provider: Provider) -> Result<SecretString, ClientError>;
}

/// Builds an HTTP client with retry middleware from a configuration.
pub(crate) fn http_client(config: &Config) -> Result<ClientWithMiddleware, ClientError> {
    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(
            config.retry_config.initial_delay,
            config.retry_config.max_delay,
        )
        .build_with_max_retries(config.retry_config.max_retries);

    let reqwest_client = match config.timeout_seconds {
        Some(timeout) => reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?,
        None => reqwest::Client::builder().build()?,
    };

    Ok(reqwest_middleware::ClientBuilder::new(reqwest_client)
        .with(RetryAfterMiddleware::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Reads the `Retry-After` header as whole seconds.
pub(crate) fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Picks the requested model, falling back to the configured one.
pub(crate) fn resolve_model(config: &Config, model: Option<&str>) -> String {
    model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map_or_else(|| config.model.clone(), str::to_string)
}

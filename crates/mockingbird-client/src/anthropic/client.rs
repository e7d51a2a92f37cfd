//! Anthropic Messages API client.
//!
//! # Examples
//!
//! ```no_run
//! use mockingbird_client::AnthropicClient;
//! use mockingbird_common::{Config, Message, Provider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new(Provider::Anthropic).with_api_key("sk-ant-...");
//! let client = AnthropicClient::new(config)?;
//!
//! let response = client
//!     .complete(&[Message::user("Hello!")], &[], None)
//!     .await?;
//! println!("{:?}", response.content);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use log::{debug, error, warn};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};

use mockingbird_common::{Config, FunctionDefinition, Message};

use crate::error::ClientError;
use crate::{http_client, resolve_model, retry_after};

use super::{ANTHROPIC_VERSION, CreateMessageRequest, DEFAULT_MAX_TOKENS, MessageResponse};

/// Client for the Anthropic Messages API.
///
/// # Security
///
/// The API key is held in a `SecretString` and redacted from `Debug` output.
#[derive(Clone)]
pub struct AnthropicClient {
    client: ClientWithMiddleware,
    api_key: Arc<SecretString>,
    base_url: String,
    config: Arc<Config>,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnthropicClient {
    /// Create a new Anthropic client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or HTTP client creation fails.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ClientError::ConfigurationError("API key is required".to_string()))?;
        let base_url = config.base_url().to_string();
        let client = http_client(&config)?;

        Ok(Self {
            client,
            api_key: Arc::new(api_key),
            base_url,
            config: Arc::new(config),
        })
    }

    /// Set the model used when a request names none.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send a transcript with the declared function stubs as tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn complete(
        &self,
        messages: &[Message],
        functions: &[FunctionDefinition],
        model: Option<&str>,
    ) -> Result<MessageResponse, ClientError> {
        let request = CreateMessageRequest::new(
            resolve_model(&self.config, model),
            self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            functions,
        );
        self.create_message(&request).await
    }

    /// Send a prepared Messages API request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn create_message(
        &self,
        request: &CreateMessageRequest,
    ) -> Result<MessageResponse, ClientError> {
        let url = format!("{}/messages", self.base_url);

        reqwest::Url::parse(&url)
            .map_err(|e| ClientError::ConfigurationError(format!("Invalid URL '{url}': {e}")))?;

        debug!(
            "Sending message request: model={}, messages={}, tools={}, system={}",
            request.model,
            request.messages.len(),
            request.tools.as_ref().map_or(0, Vec::len),
            request.system.is_some()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(request).map_err(ClientError::SerializationError)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = retry_after(&response);
            let error_text = response.text().await.map_err(|e| {
                warn!("Failed to read error response body: {e}");
                ClientError::NetworkError(e)
            })?;

            let err = ClientError::from_status(status.as_u16(), &error_text, retry_after);
            error!("API request failed with status {}: {err}", status.as_u16());
            return Err(err);
        }

        let response_text = response.text().await?;
        debug!(
            "Raw API response: {}",
            &response_text.chars().take(500).collect::<String>()
        );

        serde_json::from_str(&response_text).map_err(ClientError::SerializationError)
    }
}

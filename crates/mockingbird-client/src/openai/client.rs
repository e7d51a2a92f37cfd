//! `OpenAI` client implementation.
//!
//! # Examples
//!
//! ```no_run
//! use mockingbird_client::OpenAIClient;
//! use mockingbird_common::{Config, Message, Provider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new(Provider::OpenAI).with_api_key("sk-...");
//! let client = OpenAIClient::new(config)?;
//!
//! let response = client
//!     .complete(&[Message::user("Hello!")], &[], None)
//!     .await?;
//! println!("{:?}", response.choices.first().map(|c| &c.message.content));
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

use super::{ChatCompletionRequest, ChatCompletionResponse};

/// Client for `OpenAI`-compatible chat completion APIs.
///
/// # Security
///
/// The API key is held in a `SecretString` and redacted from `Debug` output.
#[derive(Clone)]
pub struct OpenAIClient {
    client: ClientWithMiddleware,
    api_key: Arc<SecretString>,
    base_url: String,
    config: Arc<Config>,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    /// Create a new `OpenAI` client from a configuration.
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
    ) -> Result<ChatCompletionResponse, ClientError> {
        let request = ChatCompletionRequest::new(
            resolve_model(&self.config, model),
            messages,
            functions,
        );
        self.chat_completion(&request).await
    }

    /// Send a prepared chat completion request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);

        reqwest::Url::parse(&url)
            .map_err(|e| ClientError::ConfigurationError(format!("Invalid URL '{url}': {e}")))?;

        debug!(
            "Sending chat completion: model={}, messages={}, tools={}",
            request.model,
            request.messages.len(),
            request.tools.as_ref().map_or(0, Vec::len)
        );

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
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

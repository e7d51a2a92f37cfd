//! The production [`AiCaller`]: key lookup, client construction, dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use secrecy::SecretString;

use mockingbird_common::{Config, FunctionDefinition, Message, Provider};

use crate::error::ClientError;
use crate::{AiCaller, AnthropicClient, KeySource, OpenAIClient, ProviderResponse};

/// Reads provider keys from `OPENAI_API_KEY` and `ANTHROPIC_API_KEY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvKeys;

impl EnvKeys {
    /// The environment variable holding `provider`'s key.
    #[must_use]
    pub const fn variable(provider: Provider) -> &'static str {
        match provider {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Looks up `provider`'s key in the environment.
    ///
    /// Unset and blank variables both count as missing.
    #[must_use]
    pub fn lookup(provider: Provider) -> Option<SecretString> {
        non_blank(std::env::var(Self::variable(provider)).ok())
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<SecretString> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

#[async_trait]
impl KeySource for EnvKeys {
    async fn api_key(&self, provider: Provider) -> Result<SecretString, ClientError> {
        Self::lookup(provider).ok_or_else(|| ClientError::CredentialsMissing {
            provider: provider.as_str().to_string(),
        })
    }
}

/// Dispatches transcripts to the provider they are addressed to.
///
/// Keys are fetched from the [`KeySource`] on every call, so a key stored
/// while the process runs is picked up by the next turn.
#[derive(Clone)]
pub struct ProviderGateway {
    keys: Arc<dyn KeySource>,
    openai: Config,
    anthropic: Config,
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("openai", &self.openai)
            .field("anthropic", &self.anthropic)
            .finish_non_exhaustive()
    }
}

impl ProviderGateway {
    /// Creates a gateway with default settings for both providers.
    pub fn new(keys: impl KeySource + 'static) -> Self {
        Self {
            keys: Arc::new(keys),
            openai: Config::new(Provider::OpenAI),
            anthropic: Config::new(Provider::Anthropic),
        }
    }

    /// Replaces the settings for `config.provider`.
    ///
    /// Any API key in `config` is ignored; keys always come from the key source.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        match config.provider {
            Provider::OpenAI => self.openai = config,
            Provider::Anthropic => self.anthropic = config,
        }
        self
    }

    /// The settings used for `provider`.
    #[must_use]
    pub const fn config(&self, provider: Provider) -> &Config {
        match provider {
            Provider::OpenAI => &self.openai,
            Provider::Anthropic => &self.anthropic,
        }
    }
}

#[async_trait]
impl AiCaller for ProviderGateway {
    async fn invoke(
        &self,
        provider: Provider,
        messages: &[Message],
        functions: &[FunctionDefinition],
        model: Option<&str>,
    ) -> Result<ProviderResponse, ClientError> {
        let key = self.keys.api_key(provider).await?;
        let config = self.config(provider).clone().with_secret_key(key);

        debug!(
            "Invoking {} with {} messages and {} functions",
            provider.display_name(),
            messages.len(),
            functions.len()
        );

        let response = match provider {
            Provider::OpenAI => OpenAIClient::new(config)?
                .complete(messages, functions, model)
                .await?
                .into(),
            Provider::Anthropic => AnthropicClient::new(config)?
                .complete(messages, functions, model)
                .await?
                .into(),
        };
        Ok(response)
    }
}

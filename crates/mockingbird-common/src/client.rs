//! Provider identifiers and client configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The LLM providers a conversation can run against.
///
/// Parsing is case-insensitive.
///
/// ```
/// use mockingbird_common::Provider;
///
/// let provider: Provider = "OpenAI".parse().unwrap();
/// assert_eq!(provider, Provider::OpenAI);
/// assert_eq!(provider.as_str(), "openai");
/// assert!("gemini".parse::<Provider>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Flat tool-call array with string-encoded arguments.
    #[serde(rename = "openai")]
    OpenAI,
    /// Tagged content blocks with structured arguments.
    Anthropic,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Self; 2] = [Self::OpenAI, Self::Anthropic];

    /// Returns the lowercase identifier used in requests and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Returns the human-readable provider name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Returns the model used when a request names none.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4",
            Self::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }

    /// Returns the API base URL used when none is configured.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Configuration for retry behavior with exponential backoff.
///
/// ```
/// use mockingbird_common::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig {
///     max_retries: 5,
///     initial_delay: Duration::from_millis(500),
///     max_delay: Duration::from_secs(60),
/// };
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts before failing.
    pub max_retries: u32,
    /// Initial delay before the first retry attempt.
    pub initial_delay: Duration,
    /// Maximum delay between retry attempts.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Configuration for a provider client.
///
/// ```
/// use mockingbird_common::{Config, Provider};
///
/// let config = Config::new(Provider::Anthropic)
///     .with_api_key("sk-ant-...")
///     .with_max_tokens(1024);
/// assert_eq!(config.model, "claude-3-5-sonnet-20241022");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The provider this client talks to.
    pub provider: Provider,
    /// The default model identifier.
    pub model: String,
    /// Custom base URL, for proxies and test servers.
    pub base_url: Option<String>,
    /// API key for authentication. Never serialized.
    #[serde(skip_serializing, default)]
    pub api_key: Option<SecretString>,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
    /// Retry behavior for transient failures.
    #[serde(skip)]
    pub retry_config: RetryConfig,
    /// Maximum tokens to generate. Required by tagged-block providers.
    pub max_tokens: Option<u32>,
}

impl Config {
    /// Creates a configuration for the provider with its default model.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: None,
            api_key: None,
            timeout_seconds: None,
            retry_config: RetryConfig::default(),
            max_tokens: None,
        }
    }

    /// Sets the default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets a custom base URL for API requests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the API key for authentication.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into().into()));
        self
    }

    /// Sets an API key that is already wrapped.
    #[must_use]
    pub fn with_secret_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Sets the maximum number of tokens to generate.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Returns the configured base URL or the provider default, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is empty, the base URL does not parse, or
    /// `max_tokens` is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            anyhow::bail!("Model must not be empty");
        }

        if let Some(base_url) = &self.base_url
            && let Err(e) = url::Url::parse(base_url)
        {
            anyhow::bail!("Invalid base URL '{base_url}': {e}");
        }

        if self.max_tokens == Some(0) {
            anyhow::bail!("max_tokens must be greater than 0");
        }

        Ok(())
    }
}

//! Application configuration.
//!
//! Configuration is loaded from `~/.config/mockingbird/config.toml`. Every
//! field is optional; a missing file yields the defaults.
//!
//! ## Example Configuration
//!
//! ```toml
//! default_provider = "anthropic"
//!
//! [settings]
//! max_iterations = 5
//! max_tokens = 1024
//! timeout_seconds = 60
//! max_retries = 3
//!
//! [providers.openai]
//! model = "gpt-4o"
//!
//! [providers.anthropic]
//! model = "claude-3-5-sonnet-20241022"
//! base_url = "https://api.anthropic.com/v1"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use mockingbird_common::{Config, Provider, RetryConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used when a request names none (default: openai)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default)]
    pub settings: Settings,

    /// Per-provider overrides
    #[serde(default)]
    pub providers: Providers,
}

/// Conversation and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Provider round-trips allowed per message (default: 5)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Token budget for Anthropic requests (default: 1024)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP request timeout in seconds (default: none)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Transport-level retries for transient failures (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_tokens: default_max_tokens(),
            timeout_seconds: None,
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Providers {
    #[serde(default)]
    pub openai: ProviderSettings,
    #[serde(default)]
    pub anthropic: ProviderSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Default model, overriding the built-in one
    #[serde(default)]
    pub model: Option<String>,
    /// API base URL, overriding the public endpoint
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_provider() -> String {
    Provider::OpenAI.as_str().to_string()
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_max_tokens() -> u32 {
    1024
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            settings: Settings::default(),
            providers: Providers::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined
    /// - The file exists but cannot be read or parsed
    /// - Validation fails
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if reading, parsing or validation fails.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| StoreError::Config("Failed to determine config directory".to_string()))?
            .join("mockingbird");

        Ok(config_dir.join("config.toml"))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_iterations` is zero
    /// - The default provider is not supported
    /// - A configured base URL does not parse
    pub fn validate(&self) -> Result<()> {
        if self.settings.max_iterations == 0 {
            return Err(StoreError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        self.default_provider()?;

        for provider in Provider::ALL {
            if let Some(base_url) = &self.provider_settings(provider).base_url {
                url::Url::parse(base_url).map_err(|e| {
                    StoreError::Config(format!(
                        "Invalid base_url for {provider}: '{base_url}': {e}"
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// The provider used when a request names none.
    ///
    /// # Errors
    ///
    /// Returns an error if `default_provider` is not supported.
    pub fn default_provider(&self) -> Result<Provider> {
        self.default_provider
            .parse()
            .map_err(|e| StoreError::Config(format!("{e}")))
    }

    #[must_use]
    pub const fn provider_settings(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::OpenAI => &self.providers.openai,
            Provider::Anthropic => &self.providers.anthropic,
        }
    }

    /// Builds the client configuration for `provider`, without an API key.
    #[must_use]
    pub fn client_config(&self, provider: Provider) -> Config {
        let overrides = self.provider_settings(provider);

        let mut config = Config::new(provider)
            .with_max_tokens(self.settings.max_tokens)
            .with_retry_config(RetryConfig {
                max_retries: self.settings.max_retries,
                ..RetryConfig::default()
            });
        if let Some(model) = &overrides.model {
            config = config.with_model(model.clone());
        }
        if let Some(base_url) = &overrides.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(timeout) = self.settings.timeout_seconds {
            config = config.with_timeout(timeout);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn sample_config_toml() -> &'static str {
        r#"
default_provider = "anthropic"

[settings]
max_iterations = 3
max_tokens = 2048
timeout_seconds = 30

[providers.openai]
model = "gpt-4o"
base_url = "http://localhost:8080/v1/"
        "#
    }

    #[test]
    fn test_parse_config() {
        let config: AppConfig = toml::from_str(sample_config_toml()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.default_provider().unwrap(), Provider::Anthropic);
        assert_eq!(config.settings.max_iterations, 3);
        assert_eq!(config.settings.max_tokens, 2048);
        assert_eq!(config.settings.max_retries, 3);
        assert_eq!(config.providers.openai.model.as_deref(), Some("gpt-4o"));
        assert!(config.providers.anthropic.model.is_none());
    }

    #[test]
    fn test_client_config_applies_overrides() {
        let config: AppConfig = toml::from_str(sample_config_toml()).unwrap();

        let openai = config.client_config(Provider::OpenAI);
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(openai.base_url(), "http://localhost:8080/v1");
        assert_eq!(openai.timeout_seconds, Some(30));
        assert!(openai.api_key.is_none());

        let anthropic = config.client_config(Provider::Anthropic);
        assert_eq!(anthropic.model, "claude-3-5-sonnet-20241022");
        assert_eq!(anthropic.max_tokens, Some(2048));
    }

    #[test]
    fn test_default_settings() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.settings.max_iterations, 5);
        assert_eq!(config.settings.max_tokens, 1024);
        assert!(config.settings.timeout_seconds.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config: AppConfig = toml::from_str("default_provider = \"gemini\"").unwrap();
        assert!(config.validate().is_err());

        let config: AppConfig = toml::from_str("[settings]\nmax_iterations = 0").unwrap();
        assert!(config.validate().is_err());

        let config: AppConfig =
            toml::from_str("[providers.anthropic]\nbase_url = \"not a url\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load_from(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config.settings.max_iterations, 5);
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, sample_config_toml()).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider().unwrap(), Provider::Anthropic);
    }
}

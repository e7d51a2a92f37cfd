//! Error types for the client library.

use std::time::Duration;

use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// Error response from the API.
///
/// Both providers wrap their error detail in an `error` object.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// The error detail object from the API.
    pub error: ErrorDetail,
}

/// Detailed error information from the API.
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    /// The error message text describing what went wrong.
    pub message: String,
}

/// Errors that can occur when calling an LLM provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP request failure.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error, including exhausted retries.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// No API key is stored or configured for the provider.
    #[error("API key not configured for {provider}")]
    CredentialsMissing {
        /// Lowercase provider identifier.
        provider: String,
    },

    /// The key source failed for a reason other than a missing key.
    #[error("Key source error: {0}")]
    KeySourceError(String),

    /// API authentication failure (HTTP 401).
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimitError {
        /// Suggested wait time before retrying, if provided by the API.
        retry_after: Option<Duration>,
    },

    /// Model-specific error from the API.
    #[error("Model error: {0}")]
    ModelError(String),

    /// Client configuration issue.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected or malformed API response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// API service unavailable (5xx, or 529 when Anthropic is overloaded).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ClientError {
    /// Maps a non-success HTTP response to an error.
    ///
    /// The message is taken from a structured `{"error": {"message": ...}}`
    /// body when present, otherwise the raw body is used.
    #[must_use]
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => parsed.error.message,
            Err(parse_err) => {
                debug!("Failed to parse error response as JSON: {parse_err}. Using raw text instead.");
                body.to_string()
            }
        };

        match status {
            401 => Self::AuthenticationError(message),
            429 => Self::RateLimitError { retry_after },
            500..=599 => Self::ServiceUnavailable(message),
            _ => Self::ModelError(message),
        }
    }

    /// Check if this error is potentially retryable.
    ///
    /// Returns `true` for network errors, rate limits, and service unavailable errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::MiddlewareError(_)
                | Self::RateLimitError { .. }
                | Self::ServiceUnavailable(_)
        )
    }

    /// Check if this error means no API key is configured.
    #[must_use]
    pub const fn is_credentials_missing(&self) -> bool {
        matches!(self, Self::CredentialsMissing { .. })
    }

    /// Check if this is an authentication error.
    #[must_use]
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }

    /// Get the retry-after duration if this is a rate limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitError { retry_after } => *retry_after,
            _ => None,
        }
    }
}

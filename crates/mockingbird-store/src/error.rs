//! Error types for Mockingbird storage.

use thiserror::Error;

/// Errors that can occur while reading or writing session data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Function stub not found.
    #[error("Function not found")]
    FunctionNotFound(String),

    /// No stored key for the provider.
    #[error("API key not found for this provider")]
    KeyNotFound(String),

    /// Provider outside the supported set.
    #[error("Provider must be one of: openai, anthropic")]
    UnsupportedProvider(String),

    /// Session identifier that is empty or not path-safe.
    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),

    /// Rejected input, with the message shown to the user.
    #[error("{0}")]
    Validation(String),

    /// Key encryption or decryption failure.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<mockingbird_tools::FunctionNameError> for StoreError {
    fn from(err: mockingbird_tools::FunctionNameError) -> Self {
        Self::Validation(err.to_string())
    }
}

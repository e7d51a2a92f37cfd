use thiserror::Error;

use mockingbird_client::ClientError;
use mockingbird_common::Provider;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The provider payload has no usable choice or content.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Exceeded {} tool-call iteration limit ({limit})", provider.display_name())]
    IterationLimitExceeded { provider: Provider, limit: u32 },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("{0}")]
    InvalidRequest(String),

    /// A generation reply did not have the expected shape. `raw` is the
    /// model's text with code fences removed.
    #[error("{message}")]
    Generation { message: String, raw: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl CoreError {
    /// True when the provider call failed for lack of an API key.
    #[must_use]
    pub const fn is_credentials_missing(&self) -> bool {
        matches!(self, Self::Client(e) if e.is_credentials_missing())
    }
}

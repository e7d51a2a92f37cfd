//! # mockingbird-store
//!
//! Local persistence for Mockingbird.
//!
//! - [`Storage`]: session-scoped JSON documents holding a session's function
//!   stubs and assistant instructions, written atomically and serialized per
//!   session
//! - [`KeyStore`]: the global, encrypted API key store, usable as the
//!   gateway's [`KeySource`](mockingbird_client::KeySource)
//! - [`AppConfig`]: the TOML configuration file
//! - [`DesignExport`]: a session's instructions and stubs as JSON or Markdown
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mockingbird_store::{KeyStore, NewFunction, Storage};
//! use serde_json::json;
//!
//! # fn example() -> mockingbird_store::Result<()> {
//! let storage = Arc::new(Storage::new()?);
//! let session = storage.ensure_session()?;
//!
//! storage.create_function(
//!     &session,
//!     NewFunction {
//!         name: "getExchangeRate".to_string(),
//!         mock_input: Some(json!({"from": "GBP", "to": "VND"})),
//!         mock_response: Some(json!({"rate": 31348.75})),
//!         ..NewFunction::default()
//!     },
//! )?;
//!
//! let keys = KeyStore::new(Arc::clone(&storage));
//! keys.set("openai", "sk-...")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod export;
mod functions;
mod instructions;
pub mod keys;
mod storage;

pub use config::{AppConfig, ProviderSettings, Providers, Settings};
pub use error::{Result, StoreError};
pub use export::{DesignExport, EXPORT_VERSION};
pub use functions::{FunctionUpdate, NewFunction};
pub use instructions::{Instructions, InstructionsUpdate};
pub use keys::{KeyCipher, KeyStore, MaskedKey, mask_key};
pub use storage::{Storage, validate_session_id};

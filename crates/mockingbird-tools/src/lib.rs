//! # mockingbird-tools
//!
//! Mock tool resolution for Mockingbird.
//!
//! Function stubs never execute. When the model calls one, the registry finds
//! the matching [`FunctionDefinition`](mockingbird_common::FunctionDefinition) and hands back its declared mock
//! response, so the tool-calling loop can continue while the real function
//! does not exist yet.
//!
//! ## Core Components
//!
//! - [`FunctionRegistry`]: immutable, ordered snapshot of a session's stubs
//!   with sanitization-tolerant name lookup
//! - [`mock`]: placeholder synthesis from legacy output schemas
//! - [`schema`]: function-name validation and input-schema inference from
//!   example payloads
//!
//! ## Example
//!
//! ```rust
//! use mockingbird_common::FunctionDefinition;
//! use mockingbird_tools::FunctionRegistry;
//! use serde_json::json;
//!
//! let registry = FunctionRegistry::new(vec![
//!     FunctionDefinition::builder()
//!         .name("get customer info".to_string())
//!         .mock_response(Some(json!({"tier": "gold"})))
//!         .build(),
//! ]);
//!
//! // Providers may sanitize the name before calling it.
//! assert_eq!(registry.resolve("get_customer_info"), json!({"tier": "gold"}));
//!
//! // Unknown functions degrade to a generic success payload.
//! assert_eq!(
//!     registry.resolve("missing"),
//!     json!({"result": "Function executed successfully"})
//! );
//! ```
//!
//! ## Thread Safety
//!
//! A [`FunctionRegistry`] is a read-only snapshot behind an `Arc`; clones are
//! cheap and can be shared across concurrent conversations.

pub mod mock;
mod registry;
pub mod schema;

pub use registry::{FunctionRegistry, normalize_name};
pub use schema::{FunctionNameError, infer_schema, validate_function_name};

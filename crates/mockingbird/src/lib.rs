//! # mockingbird
//!
//! Exercise assistant instructions and mock function stubs against a real
//! LLM provider before the real functions exist.
//!
//! The [`ConversationDriver`] sends a transcript to a provider, answers every
//! tool call the model makes with the matching stub's mock response, and keeps
//! going until the model produces a final natural-language answer or the
//! iteration cap is reached. A [`ProviderAdapter`] per provider reconciles the
//! two tool-calling protocols with that single loop. A [`Generator`] drafts
//! instructions and stub data through the same provider plumbing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mockingbird::{ConversationDriver, EnvKeys, FunctionRegistry, ProviderGateway};
//! use mockingbird::{FunctionDefinition, Message, Provider};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = FunctionRegistry::new(vec![
//!     FunctionDefinition::builder()
//!         .name("getExchangeRate".to_string())
//!         .description("Current exchange rate between two currencies".to_string())
//!         .mock_response(Some(json!({"rate": 31348.75})))
//!         .build(),
//! ]);
//!
//! let driver = ConversationDriver::new(ProviderGateway::new(EnvKeys)).with_max_iterations(5);
//! let result = driver
//!     .run(
//!         Provider::OpenAI,
//!         &[Message::user("How many VND is one GBP?")],
//!         &registry,
//!         None,
//!     )
//!     .await?;
//!
//! println!("{}", result.assistant_message);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod core;
pub mod error;
pub mod events;
pub mod generate;
pub mod service;

pub use mockingbird_client::*;
pub use mockingbird_common::*;
pub use mockingbird_tools::*;

pub use adapter::{AssistantTurn, ProviderAdapter};
pub use crate::core::{ConversationDriver, DEFAULT_MAX_ITERATIONS};
pub use error::CoreError;
pub use events::{DriverEvent, EventCallback};
pub use generate::{GENERATION_MAX_TOKENS, GeneratedMock, Generator, InstructionBrief};
pub use service::{ConversationReply, ConversationRequest, ConversationService, ErrorReply};

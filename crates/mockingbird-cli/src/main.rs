//! Mockingbird CLI
//!
//! Exercise assistant instructions and mock function stubs against OpenAI or
//! Anthropic from the terminal. Stubs, instructions and keys live in the local
//! data directory, scoped to the current session.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use mockingbird::{Provider, ProviderGateway};
use mockingbird_store::{AppConfig, KeyStore, Storage, validate_session_id};

mod commands;
mod display;

use crate::commands::{
    ChatArgs, ExportArgs, FunctionsCommand, InstructionsCommand, KeysCommand, SessionCommand,
};

#[derive(Parser, Debug)]
#[command(name = "mockingbird", author, version, about, long_about = None)]
struct Cli {
    /// Session to work in (defaults to the current session)
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a message and run the tool-calling loop to a final answer
    Chat(ChatArgs),
    /// Manage mock function stubs
    Functions {
        #[command(subcommand)]
        action: FunctionsCommand,
    },
    /// Manage assistant instructions
    Instructions {
        #[command(subcommand)]
        action: InstructionsCommand,
    },
    /// Manage provider API keys
    Keys {
        #[command(subcommand)]
        action: KeysCommand,
    },
    /// Show or start sessions
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },
    /// Export the session's instructions and functions
    Export(ExportArgs),
}

/// Shared state for one command.
pub struct App {
    pub storage: Arc<Storage>,
    pub keys: KeyStore,
    pub config: AppConfig,
    session: Option<String>,
}

impl App {
    fn new(session: Option<String>) -> Result<Self> {
        if let Some(id) = &session {
            validate_session_id(id)?;
        }

        let config = AppConfig::load().context("Failed to load configuration")?;
        let storage = Arc::new(Storage::new()?);

        Ok(Self::with_storage(storage, config, session))
    }

    fn with_storage(storage: Arc<Storage>, config: AppConfig, session: Option<String>) -> Self {
        Self {
            keys: KeyStore::new(Arc::clone(&storage)),
            storage,
            config,
            session,
        }
    }

    /// The session named on the command line, else the current one, started
    /// on first use.
    pub async fn session(&self) -> Result<String> {
        if let Some(id) = &self.session {
            return Ok(id.clone());
        }
        Ok(self.storage.run(Storage::ensure_session).await?)
    }

    /// Resolves a provider name, falling back to the configured default.
    pub fn provider(&self, name: Option<&str>) -> Result<Provider> {
        match name {
            Some(name) => Ok(name.parse()?),
            None => Ok(self.config.default_provider()?),
        }
    }

    /// A gateway for both providers, configured from the config file and the
    /// key store. `max_tokens` overrides the configured response budget.
    pub fn gateway(&self, max_tokens: Option<u32>) -> ProviderGateway {
        Provider::ALL.into_iter().fold(
            ProviderGateway::new(self.keys.clone()),
            |gateway, provider| {
                let mut config = self.config.client_config(provider);
                if let Some(max_tokens) = max_tokens {
                    config = config.with_max_tokens(max_tokens);
                }
                gateway.with_config(config)
            },
        )
    }
}

/// Initializes structured logging with tracing.
///
/// `MOCKINGBIRD_LOG_FORMAT` selects `pretty` (default) or `json` output, and
/// `RUST_LOG` the level. Records from `log`-based library crates are bridged
/// in as well.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("MOCKINGBIRD_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::new(cli.session)?;

    match cli.command {
        Command::Chat(args) => commands::chat(&app, args).await,
        Command::Functions { action } => action.run(&app).await,
        Command::Instructions { action } => action.run(&app).await,
        Command::Keys { action } => action.run(&app).await,
        Command::Session { action } => action.run(&app).await,
        Command::Export(args) => commands::export(&app, args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".bright_red());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_session_flag() {
        let cli = Cli::try_parse_from(["mockingbird", "session", "show", "--session", "abc"]).unwrap();
        assert_eq!(cli.session.as_deref(), Some("abc"));
        assert!(matches!(
            cli.command,
            Command::Session {
                action: SessionCommand::Show
            }
        ));
    }

    #[test]
    fn test_chat_arguments() {
        let cli = Cli::try_parse_from([
            "mockingbird",
            "chat",
            "How many VND is one GBP?",
            "--provider",
            "anthropic",
            "--max-iterations",
            "3",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Command::Chat(args) => {
                assert_eq!(args.message, "How many VND is one GBP?");
                assert_eq!(args.provider.as_deref(), Some("anthropic"));
                assert_eq!(args.max_iterations, Some(3));
                assert!(args.json);
            }
            other => unreachable!("expected chat, got {other:?}"),
        }
    }

    #[test]
    fn test_generate_subcommands() {
        let cli = Cli::try_parse_from([
            "mockingbird",
            "functions",
            "generate-mock",
            "getExchangeRate",
            "--description",
            "Current exchange rate",
            "--save",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Functions {
                action: FunctionsCommand::GenerateMock { save: true, .. }
            }
        ));

        // A description is required to draft mock data.
        assert!(Cli::try_parse_from(["mockingbird", "functions", "generate-mock", "lookup"]).is_err());

        let cli = Cli::try_parse_from([
            "mockingbird",
            "instructions",
            "generate",
            "--tone-voice",
            "Friendly",
            "--provider",
            "anthropic",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Instructions {
                action: InstructionsCommand::Generate { save: false, .. }
            }
        ));
    }

    #[test]
    fn test_export_format_defaults_to_json() {
        let cli = Cli::try_parse_from(["mockingbird", "export"]).unwrap();
        match cli.command {
            Command::Export(args) => assert_eq!(args.format, commands::ExportFormat::Json),
            other => unreachable!("expected export, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["mockingbird", "export", "--format", "markdown"]).unwrap();
        match cli.command {
            Command::Export(args) => assert_eq!(args.format, commands::ExportFormat::Markdown),
            other => unreachable!("expected export, got {other:?}"),
        }

        assert!(Cli::try_parse_from(["mockingbird", "export", "--format", "yaml"]).is_err());
    }
}

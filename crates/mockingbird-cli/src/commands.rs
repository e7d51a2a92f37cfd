//! Command implementations for the CLI.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::debug;

use mockingbird::{
    ConversationDriver, ConversationRequest, ConversationService, CoreError, GENERATION_MAX_TOKENS,
    Generator, InstructionBrief, Message,
};
use mockingbird_store::{DesignExport, FunctionUpdate, InstructionsUpdate, NewFunction, Storage};

use crate::App;
use crate::display;

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))
}

/// Arguments for `mockingbird chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Message to send
    pub message: String,

    /// Provider to use: openai or anthropic (defaults to the configured one)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model override
    #[arg(long)]
    pub model: Option<String>,

    /// JSON file holding prior turns as an array of messages
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Provider round-trips allowed before giving up
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Print the reply as JSON instead of live output
    #[arg(long)]
    pub json: bool,
}

fn read_history(path: &Path) -> Result<Vec<Message>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("History file {} is not an array of messages", path.display()))
}

/// Runs one conversation turn against the session's instructions and stubs.
pub async fn chat(app: &App, args: ChatArgs) -> Result<()> {
    let session = app.session().await?;

    let history = args.history.as_deref().map(read_history).transpose()?.unwrap_or_default();
    let provider = args
        .provider
        .unwrap_or_else(|| app.config.default_provider.clone());
    let mut request = ConversationRequest::new(args.message, provider).with_history(history);
    if let Some(model) = args.model {
        request = request.with_model(model);
    }

    debug!(session_id = %session, provider = %request.provider, "Running conversation");

    let (registry, instructions) = app
        .storage
        .run(move |s| {
            Ok((
                s.function_registry(&session)?,
                s.get_instructions(&session)?,
            ))
        })
        .await?;

    let mut driver = ConversationDriver::new(app.gateway(None)).with_max_iterations(
        args.max_iterations
            .unwrap_or(app.config.settings.max_iterations),
    );
    if !args.json {
        driver = driver.with_event_callback(display::driver_event);
    }
    let service = ConversationService::new(driver);

    match service
        .respond(&request, instructions.system_prompt(), &registry)
        .await
    {
        Ok(reply) if args.json => println!("{}", serde_json::to_string_pretty(&reply)?),
        Ok(reply) => display::assistant_reply(&reply.message),
        Err((status, reply)) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                display::error_reply(status, &reply);
            }
            bail!("conversation failed with status {status}");
        }
    }

    Ok(())
}

/// Function stub subcommands.
#[derive(Subcommand, Debug)]
pub enum FunctionsCommand {
    /// List the session's function stubs
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a function stub
    Add {
        /// Function name (letters, numbers, underscores and hyphens)
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Example arguments as JSON; the input schema is inferred from it
        #[arg(long, value_parser = parse_json)]
        mock_input: Option<Value>,
        /// Input schema as JSON, used when no mock input is given
        #[arg(long, value_parser = parse_json)]
        input_schema: Option<Value>,
        /// Value returned when the model calls the function, as JSON
        #[arg(long, value_parser = parse_json)]
        mock_response: Option<Value>,
    },
    /// Update fields of a function stub
    Update {
        /// Function ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_json)]
        mock_input: Option<Value>,
        #[arg(long, value_parser = parse_json)]
        input_schema: Option<Value>,
        #[arg(long, value_parser = parse_json)]
        mock_response: Option<Value>,
    },
    /// Delete a function stub
    Remove {
        /// Function ID
        id: String,
    },
    /// Have the model draft an example input and mock response
    GenerateMock {
        /// Function name
        name: String,
        /// What the function does
        #[arg(long)]
        description: String,
        /// Provider to use (defaults to the configured one)
        #[arg(long)]
        provider: Option<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
        /// Create the stub from the draft
        #[arg(long)]
        save: bool,
        /// Print the draft as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Shows what the model sent back before failing on a generation error.
fn generation_failed(err: CoreError) -> anyhow::Error {
    match &err {
        CoreError::Generation { raw, .. } => display::raw_response(raw),
        e if e.is_credentials_missing() => display::missing_key_hint(),
        _ => {}
    }
    err.into()
}

impl FunctionsCommand {
    pub async fn run(self, app: &App) -> Result<()> {
        let session = app.session().await?;

        match self {
            Self::List { json } => {
                let functions = app.storage.run(move |s| s.list_functions(&session)).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&functions)?);
                } else {
                    display::functions(&functions);
                }
            }
            Self::Add {
                name,
                description,
                mock_input,
                input_schema,
                mock_response,
            } => {
                let function = NewFunction {
                    name,
                    description,
                    input_schema,
                    mock_input,
                    mock_response,
                };
                let created = app
                    .storage
                    .run(move |s| s.create_function(&session, function))
                    .await?;
                display::function_saved("Created", &created);
            }
            Self::Update {
                id,
                name,
                description,
                mock_input,
                input_schema,
                mock_response,
            } => {
                let update = FunctionUpdate {
                    name,
                    description,
                    input_schema,
                    mock_input,
                    mock_response,
                };
                let updated = app
                    .storage
                    .run(move |s| s.update_function(&session, &id, update))
                    .await?;
                display::function_saved("Updated", &updated);
            }
            Self::Remove { id } => {
                app.storage
                    .run(move |s| s.delete_function(&session, &id))
                    .await?;
                display::success("Function deleted");
            }
            Self::GenerateMock {
                name,
                description,
                provider,
                model,
                save,
                json,
            } => {
                let provider = app.provider(provider.as_deref())?;
                let mock = Generator::new(app.gateway(Some(GENERATION_MAX_TOKENS)))
                    .mock(provider, &name, &description, model.as_deref())
                    .await
                    .map_err(generation_failed)?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&mock)?);
                } else {
                    display::generated_mock(&mock);
                }

                if save {
                    let function = NewFunction {
                        name,
                        description: Some(description),
                        input_schema: None,
                        mock_input: Some(mock.mock_input),
                        mock_response: Some(mock.mock_response),
                    };
                    let created = app
                        .storage
                        .run(move |s| s.create_function(&session, function))
                        .await?;
                    display::function_saved("Created", &created);
                }
            }
        }
        Ok(())
    }
}

/// Instructions subcommands.
#[derive(Subcommand, Debug)]
pub enum InstructionsCommand {
    /// Show the session's instructions
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save instructions; only the given fields change
    Set {
        /// System message text
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read the system message text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        user_intent: Option<String>,
        #[arg(long)]
        business_goal: Option<String>,
        #[arg(long)]
        conversation_goal: Option<String>,
        #[arg(long)]
        tone_voice: Option<String>,
        #[arg(long)]
        failure_cases: Option<String>,
    },
    /// Clear every field
    Clear,
    /// Have the model draft the system message from the stored fields
    Generate {
        /// Provider to use (defaults to the configured one)
        #[arg(long)]
        provider: Option<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
        /// Overrides the stored user intent
        #[arg(long)]
        user_intent: Option<String>,
        #[arg(long)]
        business_goal: Option<String>,
        #[arg(long)]
        conversation_goal: Option<String>,
        #[arg(long)]
        tone_voice: Option<String>,
        #[arg(long)]
        failure_cases: Option<String>,
        /// Save the draft as the instructions, with any overridden fields
        #[arg(long)]
        save: bool,
    },
}

impl InstructionsCommand {
    pub async fn run(self, app: &App) -> Result<()> {
        let session = app.session().await?;

        match self {
            Self::Show { json } => {
                let instructions = app
                    .storage
                    .run(move |s| s.get_instructions(&session))
                    .await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&instructions)?);
                } else {
                    display::instructions(&instructions);
                }
            }
            Self::Set {
                content,
                file,
                user_intent,
                business_goal,
                conversation_goal,
                tone_voice,
                failure_cases,
            } => {
                let content = match file {
                    Some(path) => Some(
                        std::fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read {}", path.display()))?,
                    ),
                    None => content,
                };
                let update = InstructionsUpdate {
                    content,
                    user_intent,
                    business_goal,
                    conversation_goal,
                    tone_voice,
                    failure_cases,
                    ..InstructionsUpdate::default()
                };
                app.storage
                    .run(move |s| s.save_instructions(&session, update))
                    .await?;
                display::success("Instructions saved");
            }
            Self::Clear => {
                app.storage
                    .run(move |s| s.clear_instructions(&session))
                    .await?;
                display::success("Instructions cleared");
            }
            Self::Generate {
                provider,
                model,
                user_intent,
                business_goal,
                conversation_goal,
                tone_voice,
                failure_cases,
                save,
            } => {
                let provider = app.provider(provider.as_deref())?;
                let stored = {
                    let session = session.clone();
                    app.storage
                        .run(move |s| s.get_instructions(&session))
                        .await?
                };
                let brief = InstructionBrief {
                    user_intent: user_intent.clone().unwrap_or(stored.user_intent),
                    business_goal: business_goal.clone().unwrap_or(stored.business_goal),
                    conversation_goal: conversation_goal
                        .clone()
                        .unwrap_or(stored.conversation_goal),
                    tone_voice: tone_voice.clone().unwrap_or(stored.tone_voice),
                    failure_cases: failure_cases.clone().unwrap_or(stored.failure_cases),
                };

                let content = Generator::new(app.gateway(Some(GENERATION_MAX_TOKENS)))
                    .instructions(provider, &brief, model.as_deref())
                    .await
                    .map_err(generation_failed)?;
                println!("{content}");

                if save {
                    let update = InstructionsUpdate {
                        content: Some(content),
                        user_intent,
                        business_goal,
                        conversation_goal,
                        tone_voice,
                        failure_cases,
                        ..InstructionsUpdate::default()
                    };
                    app.storage
                        .run(move |s| s.save_instructions(&session, update))
                        .await?;
                    display::success("Instructions saved");
                }
            }
        }
        Ok(())
    }
}

/// API key subcommands.
#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// List stored keys, masked
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a provider's key
    Set {
        /// openai or anthropic
        provider: String,
        /// The key; read from stdin when omitted
        api_key: Option<String>,
    },
    /// Remove a provider's stored key
    Remove {
        /// openai or anthropic
        provider: String,
    },
}

fn read_key_from_stdin() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read API key from stdin")?;
    Ok(line.trim().to_string())
}

impl KeysCommand {
    pub async fn run(self, app: &App) -> Result<()> {
        let keys = app.keys.clone();

        match self {
            Self::List { json } => {
                let listed = app.storage.run(move |_| keys.list()).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&listed)?);
                } else {
                    display::keys(&listed);
                }
            }
            Self::Set { provider, api_key } => {
                let api_key = match api_key {
                    Some(key) => key,
                    None => read_key_from_stdin()?,
                };
                let masked = app
                    .storage
                    .run(move |_| keys.set(&provider, &api_key))
                    .await?;
                display::success(&format!("API key saved ({masked})"));
            }
            Self::Remove { provider } => {
                app.storage.run(move |_| keys.remove(&provider)).await?;
                display::success("API key deleted");
            }
        }
        Ok(())
    }
}

/// Export document formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }

    fn render(self, design: &DesignExport) -> Result<String> {
        Ok(match self {
            Self::Json => design.to_json()?,
            Self::Markdown => design.to_markdown(),
        })
    }
}

/// Arguments for `mockingbird export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,

    /// File to write; a directory gets a dated file name. Prints to stdout
    /// when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Writes the session's design to stdout or a file.
pub async fn export(app: &App, args: ExportArgs) -> Result<()> {
    let session = app.session().await?;
    let design = app.storage.run(move |s| s.export_design(&session)).await?;

    if design.instructions.trim().is_empty() && design.functions.is_empty() {
        display::warning("No data to export. Add instructions and functions first.");
    }

    let text = args.format.render(&design)?;
    match args.output {
        None => println!("{text}"),
        Some(path) => {
            let path = if path.is_dir() {
                path.join(design.file_name(args.format.extension()))
            } else {
                path
            };
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            display::success(&format!("Exported to {}", path.display()));
        }
    }
    Ok(())
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Print the session in use
    Show,
    /// Start a fresh session and make it current
    New,
}

impl SessionCommand {
    pub async fn run(self, app: &App) -> Result<()> {
        match self {
            Self::Show => println!("{}", app.session().await?),
            Self::New => {
                let id = app.storage.run(Storage::new_session).await?;
                display::success(&format!("Started session {id}"));
            }
        }
        Ok(())
    }
}

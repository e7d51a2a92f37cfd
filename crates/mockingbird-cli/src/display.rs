//! Display utilities for CLI output formatting
//!
//! Live driver events, the final answer, and management listings.

use colored::Colorize;

use mockingbird::{DriverEvent, ErrorReply, FunctionDefinition, GeneratedMock, ToolCall, ToolResult};
use mockingbird_store::{Instructions, MaskedKey};

const PREVIEW_CHARS: usize = 200;

/// Shortens `text` to at most `max` characters, noting the full length.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}... ({} chars)", &text[..idx], text.chars().count()),
        None => text.to_string(),
    }
}

/// Prints a driver event as it happens.
pub fn driver_event(event: &DriverEvent) {
    match event {
        DriverEvent::ProviderCall {
            provider,
            iteration,
        } => {
            println!(
                "{} {} {}",
                "○".bright_blue(),
                provider.display_name().dimmed(),
                format!("(turn {})", iteration + 1).dimmed()
            );
        }
        DriverEvent::ToolCall(call) => tool_call(call),
        DriverEvent::ToolResult(result) => tool_result(result),
    }
}

fn tool_call(call: &ToolCall) {
    println!("{} {}", "⚙".bright_yellow(), call.name().bold());
    for (key, value) in &call.function.arguments {
        println!("  {} {value}", format!("{key}:").dimmed());
    }
}

fn tool_result(result: &ToolResult) {
    println!("{} {}", "✓".bright_green(), result.function.name);
    println!("  {}", truncate(&result.result_json(), PREVIEW_CHARS));
}

/// Prints the assistant's final answer.
pub fn assistant_reply(message: &str) {
    println!();
    println!("{}", "● Assistant".bright_magenta().bold());
    println!("{message}");
}

/// Prints a failed conversation.
pub fn error_reply(status: u16, reply: &ErrorReply) {
    eprintln!("{} {} ({status})", "Error:".bright_red(), reply.error);
    if let Some(code) = &reply.code {
        eprintln!("  code: {code}");
    }
    if let Some(details) = &reply.details {
        eprintln!("  {}", details.dimmed());
    }
    if reply.code.as_deref() == Some(mockingbird::service::API_KEY_NOT_CONFIGURED) {
        missing_key_hint();
    }
}

pub fn missing_key_hint() {
    eprintln!(
        "  {}",
        "Store one with `mockingbird keys set <provider>` or set the provider's environment variable."
            .dimmed()
    );
}

/// Prints a model reply that could not be used.
pub fn raw_response(raw: &str) {
    eprintln!("{}", "Model replied:".dimmed());
    eprintln!("{}", truncate(raw, PREVIEW_CHARS * 5).dimmed());
}

pub fn generated_mock(mock: &GeneratedMock) {
    let sections = [
        ("Mock input", &mock.mock_input),
        ("Input schema", &mock.input_schema),
        ("Mock response", &mock.mock_response),
    ];
    for (label, value) in sections {
        println!("{}", label.bold());
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        );
        println!();
    }
}

pub fn functions(functions: &[FunctionDefinition]) {
    if functions.is_empty() {
        println!("No functions in this session");
        return;
    }

    for function in functions {
        println!(
            "{} {} {}",
            "●".bright_white(),
            function.name.bright_cyan().bold(),
            function.id.as_deref().unwrap_or("-").dimmed()
        );
        if !function.description.is_empty() {
            println!("  {}", function.description);
        }
        if let Some(response) = &function.mock_response {
            println!(
                "  {} {}",
                "returns".dimmed(),
                truncate(&response.to_string(), PREVIEW_CHARS)
            );
        }
    }
}

pub fn function_saved(verb: &str, function: &FunctionDefinition) {
    println!(
        "{} {verb} {} {}",
        "✓".bright_green(),
        function.name.bright_cyan(),
        function.id.as_deref().unwrap_or("-").dimmed()
    );
}

pub fn instructions(instructions: &Instructions) {
    let fields = [
        ("Content", &instructions.content),
        ("User intent", &instructions.user_intent),
        ("Business goal", &instructions.business_goal),
        ("Conversation goal", &instructions.conversation_goal),
        ("Tone/voice", &instructions.tone_voice),
        ("Failure cases", &instructions.failure_cases),
    ];

    let mut empty = true;
    for (label, value) in fields {
        if !value.is_empty() {
            empty = false;
            println!("{}", label.bold());
            println!("{value}");
            println!();
        }
    }
    for (key, value) in &instructions.extra {
        empty = false;
        println!("{}", key.bold());
        println!("{}", value.as_str().map_or_else(|| value.to_string(), str::to_string));
        println!();
    }
    if empty {
        println!("No instructions in this session");
    }
    if let Some(updated_at) = instructions.updated_at {
        println!("{} {}", "Updated".dimmed(), updated_at.to_rfc3339().dimmed());
    }
}

pub fn keys<'a>(keys: impl IntoIterator<Item = (&'a String, &'a MaskedKey)>) {
    let mut any = false;
    for (provider, key) in keys {
        any = true;
        println!("{} {}", provider.bright_cyan(), key.masked);
    }
    if !any {
        println!("No API keys stored");
    }
}

pub fn success(message: &str) {
    println!("{} {message}", "✓".bright_green());
}

pub fn warning(message: &str) {
    eprintln!("{} {message}", "!".bright_yellow());
}

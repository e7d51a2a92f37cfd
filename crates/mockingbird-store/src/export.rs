//! Session design export as JSON or Markdown.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mockingbird_common::FunctionDefinition;

use crate::error::Result;
use crate::storage::Storage;

/// Version tag written into JSON exports.
pub const EXPORT_VERSION: &str = "1.0";

/// A session's instructions and function stubs at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignExport {
    /// The system message text.
    pub instructions: String,
    pub functions: Vec<FunctionDefinition>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn json_section(out: &mut String, title: &str, value: &Value) {
    let _ = write!(out, "**{title}:**\n\n```json\n{}\n```\n\n", pretty(value));
}

fn starts_numbered(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with('.')
}

impl DesignExport {
    /// Suggested file name, dated by export day.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("assistant-design-{}.{extension}", self.exported_at.format("%Y-%m-%d"))
    }

    /// Pretty-printed JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if a stub holds a value JSON cannot encode.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Markdown document for sharing with people.
    ///
    /// Instructions that open with a numbered item are re-flowed one item
    /// per paragraph. Stubs are listed in order with their example input,
    /// schemas and mock response.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# AI Assistant Design\n\n");
        let _ = write!(
            out,
            "*Exported on {} UTC*\n\n",
            self.exported_at.format("%d/%m/%Y, %H:%M:%S")
        );

        out.push_str("## Instructions\n\n");
        let content = self.instructions.trim();
        if content.is_empty() {
            out.push_str("*No instructions defined*\n\n");
        } else if content.lines().next().is_some_and(starts_numbered) {
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let _ = write!(out, "{line}\n\n");
            }
        } else {
            let _ = write!(out, "{content}\n\n");
        }

        out.push_str("## Functions\n\n");
        if self.functions.is_empty() {
            out.push_str("*No functions defined*\n\n");
        }
        for (idx, function) in self.functions.iter().enumerate() {
            let _ = write!(out, "### {}. {}\n\n", idx + 1, function.name);
            if !function.description.is_empty() {
                let _ = write!(out, "{}\n\n", function.description);
            }

            let mock_response = match (&function.mock_response, &function.output_schema) {
                (Some(response), _) => response.clone(),
                (None, Some(_)) => Value::String("Legacy: outputSchema".to_string()),
                (None, None) => Value::Null,
            };
            let empty = Value::Object(serde_json::Map::new());

            json_section(&mut out, "Mock Input", function.mock_input.as_ref().unwrap_or(&Value::Null));
            json_section(&mut out, "Input Schema", &function.input_schema);
            json_section(&mut out, "Mock Response", &mock_response);
            json_section(&mut out, "Output Schema", function.output_schema.as_ref().unwrap_or(&empty));
        }

        out
    }
}

impl Storage {
    /// Snapshots a session's instructions and stubs for export.
    ///
    /// # Errors
    ///
    /// Returns an error if either document cannot be read.
    pub fn export_design(&self, session_id: &str) -> Result<DesignExport> {
        Ok(DesignExport {
            instructions: self.get_instructions(session_id)?.content,
            functions: self.list_functions(session_id)?,
            exported_at: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::{InstructionsUpdate, NewFunction};

    fn design(instructions: &str, functions: Vec<FunctionDefinition>) -> DesignExport {
        DesignExport {
            instructions: instructions.to_string(),
            functions,
            exported_at: Utc.with_ymd_and_hms(2025, 11, 7, 13, 6, 16).unwrap(),
            version: EXPORT_VERSION.to_string(),
        }
    }

    #[test]
    fn test_export_reads_session() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::with_data_dir(temp.path()).unwrap();
        storage
            .save_instructions(
                "s1",
                InstructionsUpdate {
                    content: Some("You are a currency assistant.".to_string()),
                    ..InstructionsUpdate::default()
                },
            )
            .unwrap();
        storage
            .create_function(
                "s1",
                NewFunction {
                    name: "getExchangeRate".to_string(),
                    mock_input: Some(json!({"from": "GBP"})),
                    mock_response: Some(json!({"rate": 31348.75})),
                    ..NewFunction::default()
                },
            )
            .unwrap();

        let export = storage.export_design("s1").unwrap();
        assert_eq!(export.instructions, "You are a currency assistant.");
        assert_eq!(export.functions.len(), 1);

        let value: Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], json!("1.0"));
        assert_eq!(value["functions"][0]["mockResponse"], json!({"rate": 31348.75}));
        assert!(value["exportedAt"].is_string());

        assert!(storage.export_design("empty").unwrap().functions.is_empty());
    }

    #[test]
    fn test_markdown_for_empty_design() {
        let markdown = design("  ", Vec::new()).to_markdown();

        assert!(markdown.starts_with("# AI Assistant Design\n\n*Exported on 07/11/2025, 13:06:16 UTC*"));
        assert!(markdown.contains("## Instructions\n\n*No instructions defined*"));
        assert!(markdown.contains("## Functions\n\n*No functions defined*"));
    }

    #[test]
    fn test_markdown_reflows_numbered_instructions() {
        let markdown = design("1. Greet the user\n  2. Ask for the amount\n\n", Vec::new()).to_markdown();
        assert!(markdown.contains("## Instructions\n\n1. Greet the user\n\n2. Ask for the amount\n\n## Functions"));

        let markdown = design("Be brief.\nStay polite.", Vec::new()).to_markdown();
        assert!(markdown.contains("## Instructions\n\nBe brief.\nStay polite.\n\n"));
    }

    #[test]
    fn test_markdown_lists_functions() {
        let current = FunctionDefinition::builder()
            .name("getExchangeRate".to_string())
            .description("Current exchange rate".to_string())
            .mock_input(Some(json!({"from": "GBP"})))
            .mock_response(Some(json!({"rate": 31348.75})))
            .build();
        let legacy = FunctionDefinition::builder()
            .name("getCustomer".to_string())
            .output_schema(Some(json!({"type": "object"})))
            .build();

        let markdown = design("", vec![current, legacy]).to_markdown();

        assert!(markdown.contains("### 1. getExchangeRate\n\nCurrent exchange rate\n\n**Mock Input:**"));
        assert!(markdown.contains("\"rate\": 31348.75"));
        assert!(markdown.contains("### 2. getCustomer\n\n**Mock Input:**\n\n```json\nnull\n```"));
        assert!(markdown.contains("**Mock Response:**\n\n```json\n\"Legacy: outputSchema\"\n```"));
        assert!(markdown.contains("**Output Schema:**\n\n```json\n{\n  \"type\": \"object\"\n}\n```"));
    }

    #[test]
    fn test_file_name_uses_export_day() {
        assert_eq!(design("", Vec::new()).file_name("md"), "assistant-design-2025-11-07.md");
    }
}

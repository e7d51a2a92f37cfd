//! Assistant instructions, one document per session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::Result;
use crate::storage::{Storage, read_json, write_json};

const INSTRUCTIONS_FILE: &str = "instructions.json";

/// A session's assistant instructions.
///
/// `content` becomes the system message of every conversation. The other
/// fields describe the assistant and are kept for reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructions {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user_intent: String,
    #[serde(default)]
    pub business_goal: String,
    #[serde(default)]
    pub conversation_goal: String,
    #[serde(default)]
    pub tone_voice: String,
    #[serde(default)]
    pub failure_cases: String,
    /// `None` until first saved.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this version does not know about, kept as stored.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields to overwrite on save. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionsUpdate {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub user_intent: Option<String>,
    #[serde(default)]
    pub business_goal: Option<String>,
    #[serde(default)]
    pub conversation_goal: Option<String>,
    #[serde(default)]
    pub tone_voice: Option<String>,
    #[serde(default)]
    pub failure_cases: Option<String>,
    /// Other fields to set alongside the known ones.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Instructions {
    /// The system message text, if there is any besides whitespace.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        Some(self.content.as_str()).filter(|c| !c.trim().is_empty())
    }

    fn merge(&mut self, update: InstructionsUpdate) {
        let fields = [
            (&mut self.content, update.content),
            (&mut self.user_intent, update.user_intent),
            (&mut self.business_goal, update.business_goal),
            (&mut self.conversation_goal, update.conversation_goal),
            (&mut self.tone_voice, update.tone_voice),
            (&mut self.failure_cases, update.failure_cases),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        self.extra.extend(update.extra);
    }
}

impl Storage {
    /// Gets a session's instructions; empty when never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub fn get_instructions(&self, session_id: &str) -> Result<Instructions> {
        read_json(&self.session_path(session_id, INSTRUCTIONS_FILE)?)
    }

    /// Merges `update` into the stored instructions and stamps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    #[instrument(skip(self, update), fields(session_id = %session_id))]
    pub fn save_instructions(
        &self,
        session_id: &str,
        update: InstructionsUpdate,
    ) -> Result<Instructions> {
        let path = self.session_path(session_id, INSTRUCTIONS_FILE)?;

        self.with_session_lock(session_id, || {
            let mut instructions: Instructions = read_json(&path)?;
            instructions.merge(update);
            instructions.updated_at = Some(Utc::now());

            write_json(&path, &instructions)?;
            Ok(instructions)
        })
    }

    /// Replaces the document with empty fields and stamps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn clear_instructions(&self, session_id: &str) -> Result<Instructions> {
        let path = self.session_path(session_id, INSTRUCTIONS_FILE)?;
        let cleared = Instructions {
            updated_at: Some(Utc::now()),
            ..Instructions::default()
        };

        self.with_session_lock(session_id, || write_json(&path, &cleared))?;
        Ok(cleared)
    }
}

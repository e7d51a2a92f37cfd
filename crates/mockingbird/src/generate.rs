//! Drafting instructions and stub data with the provider itself.
//!
//! [`Generator`] sends a one-shot prompt through the same [`AiCaller`] the
//! conversation driver uses, so key lookup, retries and provider settings are
//! shared. No tools are offered; the model's text answer is the result.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mockingbird_client::AiCaller;
use mockingbird_common::Provider;
use mockingbird_common::chat::Message;
use mockingbird_tools::infer_schema;

use crate::adapter;
use crate::error::CoreError;

/// Token budget for generation requests.
pub const GENERATION_MAX_TOKENS: u32 = 2000;

const NOT_SPECIFIED: &str = "Not specified";

const INSTRUCTIONS_SYSTEM: &str = "You are a helpful assistant that generates AI system instructions. \
Always return only the instructions text, no markdown formatting, no explanations.";

const MOCK_SYSTEM: &str = "You are a helpful assistant that generates function definitions with \
realistic mock inputs and mock responses. Always return valid JSON only, no markdown formatting.";

const RETRY_HINT: &str = "Please try again or manually create the function definition.";

/// What the assistant is for, as input to instruction drafting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionBrief {
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
}

impl InstructionBrief {
    fn prompt(&self) -> String {
        let field = |value: &str| {
            if value.trim().is_empty() {
                NOT_SPECIFIED.to_string()
            } else {
                value.to_string()
            }
        };

        format!(
            "You are an expert at writing AI assistant instructions. Generate comprehensive system \
instructions for an AI assistant based on the following information:

User Intent: {}
Business Goal: {}
Conversation Goal: {}
Tone/Voice: {}
Failure Cases: {}

Generate detailed, actionable system instructions that:
1. Clearly define the assistant's role and purpose
2. Incorporate the specified tone and voice
3. Guide the assistant toward achieving the business and conversation goals
4. Address the potential failure cases with specific handling strategies
5. Are written in a clear, professional manner suitable for a system prompt

Return ONLY the instructions text, no markdown formatting, no explanations, just the instructions themselves.",
            field(&self.user_intent),
            field(&self.business_goal),
            field(&self.conversation_goal),
            field(&self.tone_voice),
            field(&self.failure_cases),
        )
    }
}

fn mock_prompt(name: &str, description: &str) -> String {
    format!(
        "You are a helpful assistant that generates function definitions. Generate example mock \
input and mock response for a function based on its name and description.

Function Name: {name}
Function Description: {description}

Generate:
1. A mock input - example JSON data showing what parameters this function would receive (make it realistic)
2. A mock response - example JSON data that this function would return (make it realistic and useful for testing)

Return ONLY a valid JSON object with this exact structure:
{{
  \"mockInput\": {{ ... }},
  \"mockResponse\": {{ ... }}
}}

Both should be realistic example data. Use realistic values, not placeholders like \"mock_value\"."
    )
}

/// Example data drafted for a function stub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMock {
    pub mock_input: Value,
    /// Inferred from `mock_input`.
    pub input_schema: Value,
    pub mock_response: Value,
}

/// Removes markdown code fences, optionally tagged with `language`.
fn strip_fences(text: &str, language: Option<&str>) -> String {
    let mut text = text.trim().to_string();
    if let Some(language) = language {
        let fence = format!("```{language}");
        text = text.replace(&format!("{fence}\n"), "").replace(&fence, "");
    }
    text.replace("```\n", "").replace("```", "").trim().to_string()
}

/// Drafts instructions and stub data through an [`AiCaller`].
pub struct Generator<C: AiCaller> {
    caller: C,
}

impl<C: AiCaller> Generator<C> {
    pub const fn new(caller: C) -> Self {
        Self { caller }
    }

    async fn complete(
        &self,
        provider: Provider,
        system: &str,
        prompt: String,
        model: Option<&str>,
    ) -> Result<String, CoreError> {
        let messages = [Message::system(system), Message::user(prompt)];
        let response = self.caller.invoke(provider, &messages, &[], model).await?;
        let turn = adapter::for_provider(provider).extract(response)?;
        if !turn.tool_calls.is_empty() {
            warn!("Ignoring {} tool call(s) in a generation reply", turn.tool_calls.len());
        }
        Ok(turn.text)
    }

    /// Drafts system instructions from `brief`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails or its response is
    /// malformed.
    pub async fn instructions(
        &self,
        provider: Provider,
        brief: &InstructionBrief,
        model: Option<&str>,
    ) -> Result<String, CoreError> {
        let text = self
            .complete(provider, INSTRUCTIONS_SYSTEM, brief.prompt(), model)
            .await?;
        Ok(strip_fences(&text, None))
    }

    /// Drafts an example input and response for a function, and infers the
    /// input schema from the example.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidRequest`] when `name` or `description` is blank,
    ///   before any provider call
    /// - [`CoreError::Generation`] when the reply is not the expected JSON
    /// - any provider failure
    pub async fn mock(
        &self,
        provider: Provider,
        name: &str,
        description: &str,
        model: Option<&str>,
    ) -> Result<GeneratedMock, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidRequest("Function name is required".to_string()));
        }
        if description.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "Function description is required".to_string(),
            ));
        }

        let text = self
            .complete(provider, MOCK_SYSTEM, mock_prompt(name, description), model)
            .await?;
        let raw = strip_fences(&text, Some("json"));
        debug!("Generated mock for {name}: {} bytes", raw.len());

        let Ok(mut parsed) = serde_json::from_str::<Value>(&raw) else {
            return Err(CoreError::Generation {
                message: format!("Failed to parse AI response. {RETRY_HINT}"),
                raw,
            });
        };

        let mock_input = match parsed.get_mut("mockInput").map(Value::take) {
            Some(value) if !value.is_null() => value,
            _ => {
                return Err(CoreError::Generation {
                    message: format!("AI response missing mock input. {RETRY_HINT}"),
                    raw,
                });
            }
        };
        let Some(mock_response) = parsed.get_mut("mockResponse").map(Value::take) else {
            return Err(CoreError::Generation {
                message: format!("AI response missing mock response. {RETRY_HINT}"),
                raw,
            });
        };

        Ok(GeneratedMock {
            input_schema: infer_schema(&mock_input),
            mock_input,
            mock_response,
        })
    }
}

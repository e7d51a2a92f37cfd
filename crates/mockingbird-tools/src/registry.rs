use std::borrow::Cow;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use mockingbird_common::{FunctionDefinition, ToolCall, ToolResult};

use crate::mock;

pub(crate) const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
///
/// This is the form some providers reduce function names to before calling
/// them. Unlike request-side sanitization it keeps runs of `_` and does not
/// trim, so every character maps to exactly one character.
///
/// ```
/// use mockingbird_tools::normalize_name;
///
/// assert_eq!(normalize_name("get customer info"), "get_customer_info");
/// assert_eq!(normalize_name("a.b/c"), "a_b_c");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> Cow<'_, str> {
    if name.chars().all(is_name_char) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(
            name.chars()
                .map(|c| if is_name_char(c) { c } else { '_' })
                .collect(),
        )
    }
}

/// A read-only, ordered snapshot of function stubs.
///
/// Taken once at the start of a conversation and never mutated while it runs,
/// so clones can be shared across concurrent conversations.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: Arc<[FunctionDefinition]>,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new(functions: Vec<FunctionDefinition>) -> Self {
        Self {
            functions: functions.into(),
        }
    }

    #[must_use]
    pub fn definitions(&self) -> &[FunctionDefinition] {
        &self.functions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Finds the stub a requested name refers to.
    ///
    /// A stub matches when its name equals `requested` exactly, or when both
    /// names are equal after [`normalize_name`]. Matching is case-sensitive and
    /// the first match in registry order wins.
    #[must_use]
    pub fn find(&self, requested: &str) -> Option<&FunctionDefinition> {
        let wanted = normalize_name(requested);
        self.functions
            .iter()
            .find(|f| f.name == requested || normalize_name(&f.name) == wanted)
    }

    /// Returns the mock result for a requested function name.
    ///
    /// Never fails: a declared `mock_response` is returned verbatim, otherwise
    /// a legacy output schema is synthesized, otherwise a generic success
    /// payload is returned.
    #[must_use]
    pub fn resolve(&self, requested: &str) -> Value {
        let Some(definition) = self.find(requested) else {
            debug!("No stub registered for '{requested}', using generic result");
            return mock::generic_success();
        };

        if let Some(response) = &definition.mock_response {
            return response.clone();
        }

        if let Some(schema) = &definition.output_schema {
            debug!("Stub '{}' has no mock response, synthesizing from output schema", definition.name);
            return mock::from_output_schema(schema);
        }

        mock::generic_success()
    }

    /// Resolves a tool call into its result.
    #[must_use]
    pub fn execute(&self, call: &ToolCall) -> ToolResult {
        ToolResult::for_call(call, self.resolve(call.name()))
    }
}

impl From<Vec<FunctionDefinition>> for FunctionRegistry {
    fn from(functions: Vec<FunctionDefinition>) -> Self {
        Self::new(functions)
    }
}

//! Function stub management.

use mockingbird_common::FunctionDefinition;
use mockingbird_tools::{FunctionRegistry, infer_schema, validate_function_name};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::storage::{Storage, read_json, write_json};

const FUNCTIONS_FILE: &str = "functions.json";

// Keeps an explicit `null`; only an absent field deserializes to `None`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A stub to create.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFunction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Used when no `mock_input` is given.
    #[serde(default)]
    pub input_schema: Option<Value>,
    /// Example arguments; the input schema is inferred from it.
    #[serde(default, deserialize_with = "present")]
    pub mock_input: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub mock_response: Option<Value>,
}

/// A partial update to an existing stub. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub mock_input: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub mock_response: Option<Value>,
}

impl NewFunction {
    fn into_definition(self) -> Result<FunctionDefinition> {
        validate_function_name(&self.name)?;

        let input_schema = match (&self.mock_input, self.input_schema) {
            (Some(example), _) => infer_schema(example),
            (None, Some(schema)) if schema.is_object() => schema,
            (None, _) => {
                return Err(StoreError::Validation(
                    "Mock input or input schema is required".to_string(),
                ));
            }
        };

        let Some(mock_response) = self.mock_response else {
            return Err(StoreError::Validation(
                "Mock response is required".to_string(),
            ));
        };

        Ok(FunctionDefinition::builder()
            .id(Some(Uuid::new_v4().to_string()))
            .name(self.name)
            .description(self.description.unwrap_or_default())
            .input_schema(input_schema)
            .mock_input(self.mock_input)
            .mock_response(Some(mock_response))
            .build())
    }
}

impl FunctionUpdate {
    fn apply(self, function: &mut FunctionDefinition) -> Result<()> {
        if let Some(name) = &self.name {
            validate_function_name(name)?;
        }

        if let Some(example) = &self.mock_input {
            function.input_schema = infer_schema(example);
        } else if let Some(schema) = self.input_schema
            && schema.is_object()
        {
            function.input_schema = schema;
        }

        if let Some(name) = self.name {
            function.name = name;
        }
        if let Some(description) = self.description {
            function.description = description;
        }
        if self.mock_input.is_some() {
            function.mock_input = self.mock_input;
        }
        if self.mock_response.is_some() {
            function.mock_response = self.mock_response;
        }
        Ok(())
    }
}

impl Storage {
    /// Lists a session's stubs in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub fn list_functions(&self, session_id: &str) -> Result<Vec<FunctionDefinition>> {
        read_json(&self.session_path(session_id, FUNCTIONS_FILE)?)
    }

    /// Snapshots a session's stubs as a registry for one conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub fn function_registry(&self, session_id: &str) -> Result<FunctionRegistry> {
        Ok(FunctionRegistry::new(self.list_functions(session_id)?))
    }

    /// Creates a stub and returns it with its new ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an invalid name or a missing
    /// input schema or mock response, and an error if storage fails.
    #[instrument(skip(self, function), fields(session_id = %session_id, name = %function.name))]
    pub fn create_function(
        &self,
        session_id: &str,
        function: NewFunction,
    ) -> Result<FunctionDefinition> {
        let path = self.session_path(session_id, FUNCTIONS_FILE)?;
        let created = function.into_definition()?;

        self.with_session_lock(session_id, || {
            let mut functions: Vec<FunctionDefinition> = read_json(&path)?;
            functions.push(created.clone());
            write_json(&path, &functions)
        })?;

        debug!(function_id = ?created.id, "Created function");
        Ok(created)
    }

    /// Applies a partial update to the stub with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::FunctionNotFound`] for an unknown ID,
    /// [`StoreError::Validation`] for an invalid new name, and an error if
    /// storage fails.
    #[instrument(skip(self, update), fields(session_id = %session_id, function_id = %id))]
    pub fn update_function(
        &self,
        session_id: &str,
        id: &str,
        update: FunctionUpdate,
    ) -> Result<FunctionDefinition> {
        let path = self.session_path(session_id, FUNCTIONS_FILE)?;

        self.with_session_lock(session_id, || {
            let mut functions: Vec<FunctionDefinition> = read_json(&path)?;
            let function = functions
                .iter_mut()
                .find(|f| f.id.as_deref() == Some(id))
                .ok_or_else(|| StoreError::FunctionNotFound(id.to_string()))?;

            update.apply(function)?;
            let updated = function.clone();

            write_json(&path, &functions)?;
            Ok(updated)
        })
    }

    /// Deletes the stub with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::FunctionNotFound`] for an unknown ID, and an
    /// error if storage fails.
    #[instrument(skip(self), fields(session_id = %session_id, function_id = %id))]
    pub fn delete_function(&self, session_id: &str, id: &str) -> Result<()> {
        let path = self.session_path(session_id, FUNCTIONS_FILE)?;

        self.with_session_lock(session_id, || {
            let mut functions: Vec<FunctionDefinition> = read_json(&path)?;
            let before = functions.len();
            functions.retain(|f| f.id.as_deref() != Some(id));

            if functions.len() == before {
                return Err(StoreError::FunctionNotFound(id.to_string()));
            }
            write_json(&path, &functions)
        })
    }
}

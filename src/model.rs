//! Validation entry points for one schema
//!
//! A [`Model`] pairs a resolved registry with one of its schemas. It is
//! cheap to clone and safe to share across threads.

use std::sync::Arc;

use crate::json_schema;
use crate::record::Record;
use crate::schema::{Registry, Schema};
use crate::settings::{SettingsError, SettingsSource};
use crate::validate::{ErrorKind, FieldIssue, FieldPath, SchemaValidator, ValidationError};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Model {
    registry: Registry,
    schema: Arc<Schema>,
}

impl Model {
    pub(crate) fn new(registry: Registry, schema: Arc<Schema>) -> Self {
        Self { registry, schema }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Validates parsed JSON.
    pub fn validate(&self, input: &serde_json::Value) -> Result<Record, ValidationError> {
        self.validate_value(&Value::from_json(input))
    }

    /// Validates a value (usually a map, or a record to re-validate).
    pub fn validate_value(&self, input: &Value) -> Result<Record, ValidationError> {
        SchemaValidator::new(&self.registry).validate(&self.schema, input)
    }

    /// Parses and validates JSON text.
    ///
    /// Text that is not JSON yields a single `invalid_json` issue at the
    /// record root.
    pub fn validate_json(&self, text: &str) -> Result<Record, ValidationError> {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(input) => self.validate(&input),
            Err(e) => {
                let kind = ErrorKind::InvalidJson;
                self.registry.metrics().increment_records_rejected();
                self.registry.metrics().record_issue(&kind);
                Err(ValidationError::new(
                    self.name(),
                    vec![FieldIssue::new(
                        FieldPath::root(),
                        kind,
                        format!("invalid JSON: {}", e),
                    )],
                ))
            }
        }
    }

    /// JSON Schema document describing this schema.
    pub fn json_schema(&self, by_alias: bool) -> serde_json::Value {
        json_schema::generate(&self.registry, &self.schema, by_alias)
    }

    /// Loads a record from process environment variables.
    pub fn load_settings(&self, source: &SettingsSource) -> Result<Record, SettingsError> {
        source.load(self)
    }
}

//! Settings loading
//!
//! Builds a record from environment variables. Sources, lowest priority
//! first:
//! 1. entries of a dotenv file
//! 2. process environment variables
//! 3. explicit overrides
//!
//! Variable names are `prefix + field key`, compared case-insensitively
//! unless configured otherwise. Structured fields (lists, sets, maps,
//! nested records) take JSON text. With a nested delimiter, nested records
//! can also be spelled out field by field (`APP_DB__HOST`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::Model;
use crate::observability::{log_event_with_fields, Event};
use crate::record::Record;
use crate::schema::{Registry, Schema};
use crate::validate::ValidationError;
use crate::value::Value;

/// Deepest nesting followed through the nested delimiter
const MAX_NESTING: usize = 8;

/// Settings loading error
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read env file '{path}': {reason}")]
    EnvFile { path: String, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SettingsError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SettingsError::EnvFile { .. } => "AERO_SETTINGS_ENV_FILE",
            SettingsError::Validation(_) => "AERO_SETTINGS_VALIDATION",
        }
    }
}

/// Where and how settings are read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSource {
    pub prefix: String,
    pub case_sensitive: bool,
    pub nested_delimiter: Option<String>,
    pub env_file: Option<PathBuf>,
}

impl SettingsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn nested_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.nested_delimiter = Some(delimiter.into());
        self
    }

    pub fn env_file(mut self, path: impl AsRef<Path>) -> Self {
        self.env_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Loads a record from the process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn load(&self, model: &Model) -> Result<Record, SettingsError> {
        let vars = std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        });
        self.load_with(model, vars, BTreeMap::new())
    }

    /// Loads a record from the given variables and overrides.
    ///
    /// Overrides are keyed like validation input (alias or field name) and
    /// win over every other source.
    pub fn load_with<I>(
        &self,
        model: &Model,
        vars: I,
        overrides: BTreeMap<String, Value>,
    ) -> Result<Record, SettingsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env = BTreeMap::new();
        if let Some(path) = &self.env_file {
            for (key, value) in read_env_file(path)? {
                env.insert(self.normalize(&key), value);
            }
        }
        for (key, value) in vars {
            env.insert(self.normalize(&key), value);
        }

        let prefix = self.normalize(&self.prefix);
        let mut raw = self.collect(model.registry(), model.schema(), &env, &prefix, 0);
        let from_env = raw.len().to_string();
        raw.extend(overrides);

        let record = model.validate_value(&Value::Map(raw))?;
        log_event_with_fields(
            Event::SettingsLoaded,
            &[("from_env", from_env.as_str()), ("schema", model.name())],
        );
        Ok(record)
    }

    fn normalize(&self, key: &str) -> String {
        if self.case_sensitive {
            key.to_string()
        } else {
            key.to_lowercase()
        }
    }

    /// Gathers raw values for every field of `schema` found under `prefix`.
    fn collect(
        &self,
        registry: &Registry,
        schema: &Schema,
        env: &BTreeMap<String, String>,
        prefix: &str,
        depth: usize,
    ) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();

        for field in schema.fields() {
            let mut candidates = vec![field.input_key()];
            if schema.config().populate_by_name && field.alias().is_some() {
                candidates.push(field.name());
            }

            let structured = field.field_type().is_structured();
            let found = candidates.iter().find_map(|candidate| {
                env.get(&format!("{}{}", prefix, self.normalize(candidate)))
                    .map(|text| parse_env_value(text, structured))
            });
            let var_name = format!("{}{}", prefix, self.normalize(field.input_key()));

            // Field-by-field spelling of nested records
            let nested = match (&self.nested_delimiter, field.field_type().nested_schema()) {
                (Some(delimiter), Some(target)) if depth < MAX_NESTING => registry
                    .schema(target)
                    .map(|nested| {
                        let nested_prefix = format!("{}{}", var_name, self.normalize(delimiter));
                        self.collect(registry, nested, env, &nested_prefix, depth + 1)
                    })
                    .filter(|map| !map.is_empty()),
                _ => None,
            };

            let value = match (found, nested) {
                (Some(Value::Map(mut base)), Some(parts)) => {
                    base.extend(parts);
                    Some(Value::Map(base))
                }
                (None, Some(parts)) => Some(Value::Map(parts)),
                (found, _) => found,
            };
            if let Some(value) = value {
                out.insert(field.input_key().to_string(), value);
            }
        }
        out
    }
}

/// Structured fields take JSON; text that is not JSON is passed on as a
/// string and left to coercion to reject.
fn parse_env_value(text: &str, structured: bool) -> Value {
    if structured {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
            return Value::from_json(&json);
        }
    }
    Value::Str(text.to_string())
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, SettingsError> {
    let env_error = |reason: String| SettingsError::EnvFile {
        path: path.display().to_string(),
        reason,
    };
    let iter = dotenvy::from_path_iter(path).map_err(|e| env_error(e.to_string()))?;
    iter.map(|entry| entry.map_err(|e| env_error(e.to_string())))
        .collect()
}

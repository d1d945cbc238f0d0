//! Schema definitions
//!
//! [`SchemaDef`] is what callers hand to `SchemaRegistry::define`; the
//! registry turns it into an immutable, flattened [`Schema`].
//! [`SchemaSpec`] is the data-only form stored in schema files.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use super::field::FieldDef;
use super::types::{Constraint, FieldType};
use crate::record::Record;
use crate::validate::ModelError;
use crate::value::Value;

/// Whole-record callback signature
pub type ModelValidatorFn = dyn Fn(&Record) -> Result<(), ModelError> + Send + Sync;

/// A registered whole-record callback
#[derive(Clone)]
pub struct ModelValidator {
    func: Arc<ModelValidatorFn>,
}

impl ModelValidator {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Record) -> Result<(), ModelError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    pub fn call(&self, record: &Record) -> Result<(), ModelError> {
        (self.func)(record)
    }

    /// Whether both handles share one callback
    pub fn same_as(&self, other: &ModelValidator) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for ModelValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelValidator(..)")
    }
}

/// Handling of input keys that match no declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraPolicy {
    /// Reject the record
    Forbid,
    /// Keep the keys on the record as extras
    Allow,
    /// Drop the keys silently
    #[default]
    Ignore,
}

/// Per-schema behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub extra: ExtraPolicy,
    /// Reject every assignment after construction
    pub frozen: bool,
    /// Re-run whole-record validators after each assignment
    pub revalidate_on_assignment: bool,
    /// Accept the field name as well as its alias
    pub populate_by_name: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            extra: ExtraPolicy::Ignore,
            frozen: false,
            revalidate_on_assignment: true,
            populate_by_name: false,
            description: None,
        }
    }
}

impl SchemaConfig {
    pub fn forbid_extra() -> Self {
        Self {
            extra: ExtraPolicy::Forbid,
            ..Self::default()
        }
    }

    pub fn frozen() -> Self {
        Self {
            frozen: true,
            ..Self::default()
        }
    }
}

/// A schema as handed to the registry
#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) parents: Vec<String>,
    pub(crate) config: SchemaConfig,
    pub(crate) model_validators: Vec<ModelValidator>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            parents: Vec::new(),
            config: SchemaConfig::default(),
            model_validators: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Inherit every field of an already defined schema
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a whole-record callback
    pub fn model_validator<F>(mut self, func: F) -> Self
    where
        F: Fn(&Record) -> Result<(), ModelError> + Send + Sync + 'static,
    {
        self.model_validators.push(ModelValidator::new(func));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A defined schema with its inheritance flattened.
///
/// Immutable once created; shared read-only between validation calls.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    parents: Vec<String>,
    fields: Vec<FieldDef>,
    config: SchemaConfig,
    model_validators: Vec<ModelValidator>,
}

impl Schema {
    pub(crate) fn new(
        name: String,
        parents: Vec<String>,
        fields: Vec<FieldDef>,
        config: SchemaConfig,
        model_validators: Vec<ModelValidator>,
    ) -> Self {
        Self {
            name,
            parents,
            fields,
            config,
            model_validators,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parents, in declaration order
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Resolved fields, in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn model_validators(&self) -> &[ModelValidator] {
        &self.model_validators
    }

    /// Whether `key` names a declared field by name or alias
    pub fn is_known_key(&self, key: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.name() == key || f.alias() == Some(key))
    }
}

/// Field entry of a schema file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// Absent means required; an explicit `null` is a null default
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl FieldSpec {
    pub fn into_field(self) -> FieldDef {
        let mut field = FieldDef::new(self.name, self.field_type).with_constraints(self.constraints);
        if let Some(default) = self.default {
            field = field.with_default(Value::from_json(&default));
        }
        if let Some(alias) = self.alias {
            field = field.with_alias(alias);
        }
        if let Some(description) = self.description {
            field = field.with_description(description);
        }
        field
    }
}

/// Data-only schema definition, as stored in schema files.
///
/// Callbacks cannot be expressed here; schemas that need them are
/// defined in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub config: SchemaConfig,
}

impl SchemaSpec {
    /// Names this spec needs defined before it: parents and eager references.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self.extends.iter().map(String::as_str).collect();
        for field in &self.fields {
            for (target, lazy) in field.field_type.references() {
                if !lazy && target != self.name && !deps.contains(&target) {
                    deps.push(target);
                }
            }
        }
        deps
    }

    pub fn into_def(self) -> SchemaDef {
        let mut def = SchemaDef::new(self.name).config(self.config);
        for parent in self.extends {
            def = def.extends(parent);
        }
        def.fields(self.fields.into_iter().map(FieldSpec::into_field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SchemaConfig::default();
        assert_eq!(config.extra, ExtraPolicy::Ignore);
        assert!(!config.frozen);
        assert!(config.revalidate_on_assignment);
        assert!(!config.populate_by_name);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: SchemaConfig = serde_json::from_str(r#"{"extra": "forbid"}"#).unwrap();
        assert_eq!(config.extra, ExtraPolicy::Forbid);
        assert!(config.revalidate_on_assignment);
    }

    #[test]
    fn test_field_spec_default_presence() {
        let required: FieldSpec =
            serde_json::from_str(r#"{"name": "a", "type": "int"}"#).unwrap();
        assert!(required.default.is_none());
        assert!(required.into_field().is_required());

        let nullable: FieldSpec = serde_json::from_str(
            r#"{"name": "b", "type": "optional", "inner": {"type": "int"}, "default": null}"#,
        )
        .unwrap();
        assert_eq!(nullable.default, Some(serde_json::Value::Null));
        let field = nullable.into_field();
        assert_eq!(field.default().produce(), Some(Value::Null));
    }

    #[test]
    fn test_spec_dependencies_skip_lazy_and_self() {
        let spec: SchemaSpec = serde_json::from_str(
            r#"{
                "name": "Node",
                "extends": ["Base"],
                "fields": [
                    {"name": "owner", "type": "nested", "schema": "User"},
                    {"name": "children", "type": "list", "items": {"type": "nested", "schema": "Node", "lazy": true}},
                    {"name": "peer", "type": "nested", "schema": "Peer", "lazy": true}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.dependencies(), vec!["Base", "User"]);
    }

    #[test]
    fn test_schema_known_keys() {
        let schema = Schema::new(
            "User".into(),
            Vec::new(),
            vec![FieldDef::required_string("name").with_alias("fullName")],
            SchemaConfig::default(),
            Vec::new(),
        );
        assert!(schema.is_known_key("name"));
        assert!(schema.is_known_key("fullName"));
        assert!(!schema.is_known_key("age"));
        assert_eq!(schema.field_index("name"), Some(0));
    }
}

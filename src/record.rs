//! Validated records
//!
//! A [`Record`] only comes into existence through validation. It holds one
//! value per declared field, in declaration order, and remembers which
//! fields the input supplied explicitly.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::observability::{log_event_with_fields, Event};
use crate::schema::{Registry, Schema};
use crate::serialize::{self, DumpOptions};
use crate::validate::{
    run_field, run_model_validators, ErrorKind, FieldIssue, FieldPath, ValidationError,
};
use crate::value::Value;

/// A validated instance of a schema
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    registry: Registry,
    values: Vec<Value>,
    fields_set: BTreeSet<String>,
    extras: BTreeMap<String, Value>,
}

impl Record {
    pub(crate) fn new(
        schema: Arc<Schema>,
        registry: Registry,
        values: Vec<Value>,
        fields_set: BTreeSet<String>,
        extras: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            schema,
            registry,
            values,
            fields_set,
            extras,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn schema_name(&self) -> &str {
        self.schema.name()
    }

    /// Value of a declared field; secrets stay wrapped.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.field_index(name).map(|i| &self.values[i])
    }

    /// Value of a declared field with any secret unwrapped.
    pub fn reveal(&self, name: &str) -> Option<&Value> {
        self.get(name).map(Value::reveal)
    }

    /// `(name, value)` pairs in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name())
            .zip(self.values.iter())
    }

    /// Fields supplied by input or assigned since, as opposed to defaulted
    pub fn fields_set(&self) -> &BTreeSet<String> {
        &self.fields_set
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields_set.contains(name)
    }

    /// Undeclared keys kept under `ExtraPolicy::Allow`
    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }

    /// Field values keyed by field name
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.fields()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    /// Field values keyed by their input key (alias or name), plus extras.
    ///
    /// Feeding the result back through validation reproduces this record.
    pub fn to_input_map(&self) -> BTreeMap<String, Value> {
        let mut map: BTreeMap<String, Value> = self
            .schema
            .fields()
            .iter()
            .zip(self.values.iter())
            .map(|(field, value)| (field.input_key().to_string(), value.clone()))
            .collect();
        for (key, value) in &self.extras {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }

    /// Assigns a field, re-running its pipeline.
    ///
    /// With `revalidate_on_assignment`, whole-record validators run against
    /// the updated record as well. On any failure the previous value is kept.
    ///
    /// # Errors
    ///
    /// - `frozen` issue if the schema is frozen
    /// - `extra_forbidden` issue if `name` is not a declared field
    /// - the field's coercion or constraint issues
    /// - whole-record issues
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        let result = self.try_set(name, value.into());

        let metrics = self.registry.metrics();
        match &result {
            Ok(()) => metrics.increment_assignments(),
            Err(issues) => {
                metrics.increment_assignments_rejected();
                for issue in issues {
                    metrics.record_issue(&issue.kind);
                }
                let count = issues.len().to_string();
                log_event_with_fields(
                    Event::AssignmentRejected,
                    &[
                        ("field", name),
                        ("issues", count.as_str()),
                        ("schema", self.schema.name()),
                    ],
                );
            }
        }
        result.map_err(|issues| ValidationError::new(self.schema.name(), issues))
    }

    fn try_set(&mut self, name: &str, value: Value) -> Result<(), Vec<FieldIssue>> {
        let path = FieldPath::field(name);
        if self.schema.config().frozen {
            return Err(vec![FieldIssue::frozen(path)]);
        }
        let Some(index) = self.schema.field_index(name) else {
            return Err(vec![FieldIssue::new(
                path,
                ErrorKind::ExtraForbidden,
                format!("object has no field '{}'", name),
            )]);
        };

        let mut context = self.to_map();
        context.remove(name);

        let schema = Arc::clone(&self.schema);
        let field = &schema.fields()[index];
        let coerced = run_field(&self.registry, field, value, &context)
            .map_err(|issues| issues.into_iter().map(|i| i.under(&path)).collect::<Vec<_>>())?;

        let previous = std::mem::replace(&mut self.values[index], coerced);
        if schema.config().revalidate_on_assignment {
            let issues = run_model_validators(self);
            if !issues.is_empty() {
                self.values[index] = previous;
                return Err(issues);
            }
        }
        self.fields_set.insert(name.to_string());
        Ok(())
    }

    /// Projects the record to a JSON object.
    pub fn dump(&self, options: &DumpOptions) -> serde_json::Map<String, serde_json::Value> {
        serialize::dump(self, options)
    }

    /// Projects the record to compact JSON text.
    pub fn dump_json(&self, options: &DumpOptions) -> String {
        serialize::dump_json(self, options)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name()
            && self.values == other.values
            && self.extras == other.extras
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.schema.name());
        for (name, value) in self.fields() {
            s.field(name, value);
        }
        s.finish()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::Object(self.dump(&DumpOptions::default())).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Constraint, FieldDef, FieldType, SchemaConfig, SchemaDef, SchemaRegistry};
    use crate::validate::ModelError;
    use serde_json::json;

    fn interval_registry(config: SchemaConfig) -> Registry {
        let mut registry = SchemaRegistry::new();
        registry
            .define(
                SchemaDef::new("Interval")
                    .field(FieldDef::required_int("start"))
                    .field(FieldDef::required_int("end").with_constraint(Constraint::Le(100.0)))
                    .field(FieldDef::optional("label", FieldType::String))
                    .config(config)
                    .model_validator(|record| {
                        let start = record.get("start").and_then(Value::as_i64);
                        let end = record.get("end").and_then(Value::as_i64);
                        match (start, end) {
                            (Some(s), Some(e)) if s >= e => {
                                Err(ModelError::new("start must be before end"))
                            }
                            _ => Ok(()),
                        }
                    }),
            )
            .unwrap();
        registry.resolve().unwrap()
    }

    fn interval(registry: &Registry) -> Record {
        registry
            .model("Interval")
            .unwrap()
            .validate(&json!({"start": 1, "end": 10}))
            .unwrap()
    }

    #[test]
    fn test_accessors() {
        let registry = interval_registry(SchemaConfig::default());
        let record = interval(&registry);

        assert_eq!(record.schema_name(), "Interval");
        assert_eq!(record.get("start"), Some(&Value::Int(1)));
        assert_eq!(record.get("nope"), None);
        let names: Vec<&str> = record.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["start", "end", "label"]);
        assert_eq!(
            record.fields_set().iter().cloned().collect::<Vec<_>>(),
            vec!["end".to_string(), "start".to_string()]
        );
    }

    #[test]
    fn test_set_coerces_and_marks_set() {
        let registry = interval_registry(SchemaConfig::default());
        let mut record = interval(&registry);

        record.set("end", "20").unwrap();
        assert_eq!(record.get("end"), Some(&Value::Int(20)));

        record.set("label", "lunch").unwrap();
        assert!(record.is_set("label"));
        assert_eq!(registry.metrics().snapshot().assignments, 2);
    }

    #[test]
    fn test_set_rejects_and_keeps_previous() {
        let registry = interval_registry(SchemaConfig::default());
        let mut record = interval(&registry);

        let err = record.set("end", 500).unwrap_err();
        assert_eq!(err.issues()[0].path.to_string(), "end");
        assert_eq!(record.get("end"), Some(&Value::Int(10)));

        let err = record.set("end", 0).unwrap_err();
        assert_eq!(err.issues()[0].kind, ErrorKind::Model);
        assert_eq!(record.get("end"), Some(&Value::Int(10)));

        let err = record.set("missing", 1).unwrap_err();
        assert_eq!(err.issues()[0].kind, ErrorKind::ExtraForbidden);
        assert_eq!(registry.metrics().snapshot().assignments_rejected, 3);
    }

    #[test]
    fn test_set_without_revalidation() {
        let registry = interval_registry(SchemaConfig {
            revalidate_on_assignment: false,
            ..SchemaConfig::default()
        });
        let mut record = interval(&registry);

        record.set("end", 0).unwrap();
        assert_eq!(record.get("end"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_frozen_rejects_assignment() {
        let registry = interval_registry(SchemaConfig::frozen());
        let mut record = interval(&registry);

        let err = record.set("start", 2).unwrap_err();
        assert_eq!(err.issues()[0].kind, ErrorKind::Frozen);
        assert_eq!(record.get("start"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_equality_ignores_fields_set() {
        let registry = interval_registry(SchemaConfig::default());
        let model = registry.model("Interval").unwrap();
        let a = model.validate(&json!({"start": 1, "end": 10})).unwrap();
        let b = model
            .validate(&json!({"start": 1, "end": 10, "label": null}))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a.fields_set(), b.fields_set());
    }

    #[test]
    fn test_clone_is_independent() {
        let registry = interval_registry(SchemaConfig::default());
        let original = interval(&registry);
        let mut copy = original.clone();
        copy.set("end", 50).unwrap();
        assert_eq!(original.get("end"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_serialize_uses_default_dump() {
        let registry = interval_registry(SchemaConfig::default());
        let record = interval(&registry);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"start": 1, "end": 10, "label": null})
        );
    }
}

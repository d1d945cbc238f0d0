//! Record validator
//!
//! Validation semantics:
//! - Every declared field is attempted; issues accumulate
//! - Absent fields take their default, or produce a `missing` issue
//! - Keys matching no field follow the schema's extra policy
//! - Whole-record validators run only when every field passed
//!
//! No partial record is ever observable: the result is either a complete
//! `Record` or the full list of issues.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::coerce::Coercer;
use crate::observability::{log_event_with_fields, Event};
use crate::record::Record;
use crate::schema::{ExtraPolicy, FieldContext, FieldDef, Registry, Schema, ValidatorMode};
use crate::value::Value;

use super::constraints::validate_field;
use super::errors::{CoercionError, FieldIssue, FieldPath, ValidationError};

/// Validates raw input against schemas of one registry.
pub struct SchemaValidator<'a> {
    registry: &'a Registry,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Validates raw input into a record.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` holding every issue found, in field
    /// declaration order followed by extra keys and record-level issues.
    pub fn validate(&self, schema: &Arc<Schema>, raw: &Value) -> Result<Record, ValidationError> {
        let metrics = self.registry.metrics();
        match validate_record(self.registry, schema, raw) {
            Ok(record) => {
                metrics.increment_records_validated();
                log_event_with_fields(Event::RecordValidated, &[("schema", schema.name())]);
                Ok(record)
            }
            Err(issues) => {
                metrics.increment_records_rejected();
                for issue in &issues {
                    metrics.record_issue(&issue.kind);
                }
                let count = issues.len().to_string();
                log_event_with_fields(
                    Event::RecordRejected,
                    &[("schema", schema.name()), ("issues", count.as_str())],
                );
                Err(ValidationError::new(schema.name(), issues))
            }
        }
    }
}

/// Validates raw input into a record, without metrics or logging.
///
/// Used directly for nested records so that one top-level attempt counts
/// once. Accepts a map, or a record whose fields are re-validated.
pub fn validate_record(
    registry: &Registry,
    schema: &Arc<Schema>,
    raw: &Value,
) -> Result<Record, Vec<FieldIssue>> {
    let converted;
    let input = match raw {
        Value::Map(map) => map,
        Value::Record(record) => {
            converted = record.to_input_map();
            &converted
        }
        other => {
            return Err(vec![FieldIssue::coercion(
                FieldPath::root(),
                CoercionError::new(schema.name(), other.type_name()),
            )])
        }
    };

    let config = schema.config();
    let mut issues = Vec::new();
    let mut data: BTreeMap<String, Value> = BTreeMap::new();
    let mut fields_set = BTreeSet::new();
    let mut consumed: BTreeSet<&str> = BTreeSet::new();

    for field in schema.fields() {
        let path = FieldPath::field(field.name());
        let supplied = lookup(input, field, config.populate_by_name);

        match supplied {
            Some((key, raw_value)) => {
                consumed.insert(key);
                fields_set.insert(field.name().to_string());
                match run_field(registry, field, raw_value.clone(), &data) {
                    Ok(value) => {
                        data.insert(field.name().to_string(), value);
                    }
                    Err(errs) => issues.extend(errs.into_iter().map(|i| i.under(&path))),
                }
            }
            None => match field.default().produce() {
                Some(value) => {
                    data.insert(field.name().to_string(), value);
                }
                None => issues.push(FieldIssue::missing(path)),
            },
        }
    }

    let mut extras = BTreeMap::new();
    for (key, value) in input {
        if consumed.contains(key.as_str()) || is_field_key(schema, key, config.populate_by_name) {
            continue;
        }
        match config.extra {
            ExtraPolicy::Forbid => issues.push(FieldIssue::extra_forbidden(FieldPath::field(key))),
            ExtraPolicy::Allow => {
                extras.insert(key.clone(), value.clone());
            }
            ExtraPolicy::Ignore => {}
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    let values = schema
        .fields()
        .iter()
        .map(|field| data.remove(field.name()).unwrap_or(Value::Null))
        .collect();
    let record = Record::new(
        Arc::clone(schema),
        registry.clone(),
        values,
        fields_set,
        extras,
    );

    let model_issues = run_model_validators(&record);
    if model_issues.is_empty() {
        Ok(record)
    } else {
        Err(model_issues)
    }
}

/// Finds the input entry for a field: alias (or name) first, then the name
/// when `populate_by_name` is set.
fn lookup<'i>(
    input: &'i BTreeMap<String, Value>,
    field: &FieldDef,
    populate_by_name: bool,
) -> Option<(&'i str, &'i Value)> {
    let primary = input.get_key_value(field.input_key());
    let fallback = || {
        if populate_by_name && field.alias().is_some() {
            input.get_key_value(field.name())
        } else {
            None
        }
    };
    primary
        .or_else(fallback)
        .map(|(key, value)| (key.as_str(), value))
}

/// Whether `key` addresses a declared field, so it is never an extra.
fn is_field_key(schema: &Schema, key: &str, populate_by_name: bool) -> bool {
    schema
        .fields()
        .iter()
        .any(|f| f.input_key() == key || (populate_by_name && f.name() == key))
}

/// Runs one field's pipeline: before-callbacks, coercion, constraints,
/// after-callbacks. Issues are relative to the field.
pub(crate) fn run_field(
    registry: &Registry,
    field: &FieldDef,
    raw: Value,
    data: &BTreeMap<String, Value>,
) -> Result<Value, Vec<FieldIssue>> {
    let ctx = FieldContext::new(field.name(), data);
    let callback_issue = |e| vec![FieldIssue::constraint(FieldPath::root(), e)];

    let mut value = raw;
    for validator in field.validators(ValidatorMode::Before) {
        value = validator.call(value, &ctx).map_err(callback_issue)?;
    }

    let value = Coercer::new(registry).coerce(&value, field.field_type())?;
    let mut value = validate_field(value, field.constraints()).map_err(callback_issue)?;

    for validator in field.validators(ValidatorMode::After) {
        value = validator.call(value, &ctx).map_err(callback_issue)?;
    }
    Ok(value)
}

/// Runs every whole-record validator and collects their failures.
pub(crate) fn run_model_validators(record: &Record) -> Vec<FieldIssue> {
    record
        .schema()
        .model_validators()
        .iter()
        .filter_map(|validator| validator.call(record).err())
        .map(FieldIssue::model)
        .collect()
}

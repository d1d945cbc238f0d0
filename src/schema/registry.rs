//! Schema registry
//!
//! Two phases:
//! - [`SchemaRegistry`] accepts definitions through `define`. Inheritance is
//!   flattened and every structural rule is checked right there.
//! - `resolve` checks that every nested reference names a defined schema
//!   and freezes the set into a [`Registry`], which is read-only, cheap to
//!   clone and safe to share across threads.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::definition::{ModelValidator, Schema, SchemaDef};
use super::errors::{SchemaError, SchemaResult};
use super::field::FieldDef;
use crate::error;
use crate::model::Model;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::record::Record;
use crate::value::Value;

/// Mutable registry accepting schema definitions
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
    /// Definition order, for deterministic iteration
    order: Vec<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if:
    /// - the name is already defined
    /// - a field is declared twice, or an alias collides with a field
    /// - a parent is unknown, or two parents disagree on a field's type
    /// - a constraint does not apply to its field's type
    /// - an eager nested reference closes a cycle
    pub fn define(&mut self, def: SchemaDef) -> SchemaResult<Arc<Schema>> {
        let SchemaDef {
            name,
            fields: own_fields,
            parents,
            config,
            model_validators: own_validators,
        } = def;

        if self.schemas.contains_key(&name) {
            return Err(SchemaError::AlreadyDefined(name));
        }

        let mut seen = HashSet::new();
        for field in &own_fields {
            if !seen.insert(field.name()) {
                return Err(SchemaError::DuplicateField {
                    schema: name,
                    field: field.name().to_string(),
                });
            }
        }

        let mut fields: Vec<FieldDef> = Vec::new();
        let mut model_validators: Vec<ModelValidator> = Vec::new();

        for parent_name in &parents {
            let parent = self
                .schemas
                .get(parent_name)
                .ok_or_else(|| SchemaError::UnknownParent {
                    schema: name.clone(),
                    parent: parent_name.clone(),
                })?;

            for inherited in parent.fields() {
                match fields.iter().find(|f| f.name() == inherited.name()) {
                    // First parent wins when both agree on the type
                    Some(existing) if existing.field_type() == inherited.field_type() => {}
                    Some(existing) => {
                        // A child redeclaration settles the conflict
                        if own_fields.iter().any(|f| f.name() == inherited.name()) {
                            continue;
                        }
                        return Err(SchemaError::IncompatibleField {
                            schema: name,
                            field: inherited.name().to_string(),
                            first: existing.field_type().type_name(),
                            second: inherited.field_type().type_name(),
                        });
                    }
                    None => fields.push(inherited.clone()),
                }
            }

            for validator in parent.model_validators() {
                if !model_validators.iter().any(|v| v.same_as(validator)) {
                    model_validators.push(validator.clone());
                }
            }
        }

        for field in own_fields {
            match fields.iter_mut().find(|f| f.name() == field.name()) {
                Some(slot) => *slot = field,
                None => fields.push(field),
            }
        }
        model_validators.extend(own_validators);

        check_aliases(&name, &fields)?;
        check_constraints(&name, &fields)?;
        self.check_cycles(&name, &fields)?;

        let schema = Arc::new(Schema::new(
            name.clone(),
            parents,
            fields,
            config,
            model_validators,
        ));

        let field_count = schema.fields().len().to_string();
        log_event_with_fields(
            Event::SchemaDefined,
            &[("schema", name.as_str()), ("fields", field_count.as_str())],
        );

        self.order.push(name.clone());
        self.schemas.insert(name, Arc::clone(&schema));
        Ok(schema)
    }

    /// Checks every nested reference and freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnresolvedReference` for the first reference
    /// (in definition order) that names an undefined schema.
    pub fn resolve(self) -> SchemaResult<Registry> {
        for name in &self.order {
            let schema = &self.schemas[name];
            for field in schema.fields() {
                for (target, _) in field.field_type().references() {
                    if !self.schemas.contains_key(target) {
                        return Err(SchemaError::UnresolvedReference {
                            schema: name.clone(),
                            field: field.name().to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        let count = self.order.len().to_string();
        log_event_with_fields(Event::RegistryResolved, &[("schemas", count.as_str())]);

        Ok(Registry {
            inner: Arc::new(RegistryInner {
                schemas: self.schemas,
                order: self.order,
                metrics: MetricsRegistry::new(),
            }),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Walks eager references from the candidate schema looking for a path
    /// back to it. Lazy references and undefined targets end the walk.
    fn check_cycles(&self, name: &str, fields: &[FieldDef]) -> SchemaResult<()> {
        for field in fields {
            for (target, lazy) in field.field_type().references() {
                if lazy {
                    continue;
                }
                let mut trail = vec![name.to_string()];
                let mut visited = HashSet::new();
                if self.reaches(target, name, &mut trail, &mut visited) {
                    return Err(SchemaError::CyclicReference {
                        schema: name.to_string(),
                        field: field.name().to_string(),
                        cycle: trail.join(" -> "),
                    });
                }
            }
        }
        Ok(())
    }

    fn reaches(
        &self,
        current: &str,
        goal: &str,
        trail: &mut Vec<String>,
        visited: &mut HashSet<String>,
    ) -> bool {
        trail.push(current.to_string());
        if current == goal {
            return true;
        }
        if visited.insert(current.to_string()) {
            if let Some(schema) = self.schemas.get(current) {
                for field in schema.fields() {
                    for (next, lazy) in field.field_type().references() {
                        if !lazy && self.reaches(next, goal, trail, visited) {
                            return true;
                        }
                    }
                }
            }
        }
        trail.pop();
        false
    }
}

fn check_aliases(schema: &str, fields: &[FieldDef]) -> SchemaResult<()> {
    for field in fields {
        let Some(alias) = field.alias() else {
            continue;
        };
        let collides = fields.iter().any(|other| {
            other.name() != field.name()
                && (other.name() == alias || other.alias() == Some(alias))
        });
        if collides {
            return Err(SchemaError::AliasCollision {
                schema: schema.to_string(),
                field: field.name().to_string(),
                alias: alias.to_string(),
            });
        }
    }
    Ok(())
}

fn check_constraints(schema: &str, fields: &[FieldDef]) -> SchemaResult<()> {
    for field in fields {
        for constraint in field.constraints() {
            if !constraint.applies_to(field.field_type()) {
                return Err(SchemaError::InvalidConstraint {
                    schema: schema.to_string(),
                    field: field.name().to_string(),
                    constraint: constraint.name().to_string(),
                    field_type: field.field_type().type_name(),
                });
            }
        }
    }
    Ok(())
}

struct RegistryInner {
    schemas: HashMap<String, Arc<Schema>>,
    order: Vec<String>,
    metrics: MetricsRegistry,
}

/// Resolved, read-only set of schemas
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.inner.schemas.get(name)
    }

    /// Returns a validation handle for the named schema.
    pub fn model(&self, name: &str) -> SchemaResult<Model> {
        let schema = self
            .schema(name)
            .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))?;
        Ok(Model::new(self.clone(), Arc::clone(schema)))
    }

    /// Schema names in definition order
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.inner.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.order.is_empty()
    }

    /// Counters shared by every validation through this registry
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.inner.metrics
    }

    /// Generates a JSON Schema document for the named schema.
    pub fn json_schema(&self, name: &str, by_alias: bool) -> SchemaResult<serde_json::Value> {
        Ok(self.model(name)?.json_schema(by_alias))
    }

    /// Validates parsed JSON against the named schema.
    pub fn validate(&self, name: &str, input: &serde_json::Value) -> error::Result<Record> {
        Ok(self.model(name)?.validate(input)?)
    }

    /// Parses and validates JSON text against the named schema.
    pub fn validate_json(&self, name: &str, text: &str) -> error::Result<Record> {
        Ok(self.model(name)?.validate_json(text)?)
    }

    pub fn validate_value(&self, name: &str, input: &Value) -> error::Result<Record> {
        Ok(self.model(name)?.validate_value(input)?)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("schemas", &self.inner.order)
            .finish()
    }
}

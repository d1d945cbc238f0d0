//! Field descriptors
//!
//! A [`FieldDef`] carries one field's declared type, constraints, default,
//! alias and user callbacks. Descriptors are immutable once their schema is
//! defined.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::types::{Constraint, FieldType};
use crate::validate::ConstraintError;
use crate::value::Value;

/// Signature of a user field callback.
///
/// Receives the value (raw for `Before`, coerced for `After`) and the
/// partially validated record; returns the possibly transformed value.
pub type FieldValidatorFn =
    dyn Fn(Value, &FieldContext<'_>) -> Result<Value, ConstraintError> + Send + Sync;

/// Default factory signature
pub type DefaultFactoryFn = dyn Fn() -> Value + Send + Sync;

/// When a field callback runs relative to coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorMode {
    /// On the raw input, before coercion
    Before,
    /// On the coerced value, after built-in constraints
    After,
}

/// A registered field callback
#[derive(Clone)]
pub struct FieldValidator {
    mode: ValidatorMode,
    func: Arc<FieldValidatorFn>,
}

impl FieldValidator {
    pub fn new<F>(mode: ValidatorMode, func: F) -> Self
    where
        F: Fn(Value, &FieldContext<'_>) -> Result<Value, ConstraintError> + Send + Sync + 'static,
    {
        Self {
            mode,
            func: Arc::new(func),
        }
    }

    pub fn mode(&self) -> ValidatorMode {
        self.mode
    }

    pub fn call(&self, value: Value, ctx: &FieldContext<'_>) -> Result<Value, ConstraintError> {
        (self.func)(value, ctx)
    }
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Context handed to field callbacks
#[derive(Debug)]
pub struct FieldContext<'a> {
    field: &'a str,
    data: &'a BTreeMap<String, Value>,
}

impl<'a> FieldContext<'a> {
    pub fn new(field: &'a str, data: &'a BTreeMap<String, Value>) -> Self {
        Self { field, data }
    }

    /// Name of the field being validated
    pub fn field(&self) -> &str {
        self.field
    }

    /// A field that has already been validated.
    ///
    /// During construction only fields declared earlier and validated
    /// successfully are visible; during assignment every other field is.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        self.data
    }
}

/// A field's default
#[derive(Clone)]
pub enum DefaultValue {
    /// Input must supply the field
    Required,
    /// Used as-is when the field is absent
    Value(Value),
    /// Called for every record that omits the field
    Factory(Arc<DefaultFactoryFn>),
}

impl DefaultValue {
    pub fn is_required(&self) -> bool {
        matches!(self, DefaultValue::Required)
    }

    /// Produces the default, or `None` if the field is required.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultValue::Required => None,
            DefaultValue::Value(v) => Some(v.clone()),
            DefaultValue::Factory(f) => Some(f()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Required => write!(f, "Required"),
            DefaultValue::Value(v) => write!(f, "Value({:?})", v),
            DefaultValue::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Field descriptor
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    field_type: FieldType,
    constraints: Vec<Constraint>,
    default: DefaultValue,
    alias: Option<String>,
    description: Option<String>,
    validators: Vec<FieldValidator>,
}

impl FieldDef {
    /// Create a required field of the given type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            constraints: Vec::new(),
            default: DefaultValue::Required,
            alias: None,
            description: None,
            validators: Vec::new(),
        }
    }

    /// Create a required string field
    pub fn required_string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Create a required int field
    pub fn required_int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// Create a required float field
    pub fn required_float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Create a required bool field
    pub fn required_bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// Create an optional field of the given type defaulting to null
    pub fn optional(name: impl Into<String>, inner: FieldType) -> Self {
        Self::new(name, FieldType::optional(inner)).with_default(Value::Null)
    }

    /// Create a field embedding another schema
    pub fn nested(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self::new(name, FieldType::nested(schema))
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    pub fn with_default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Factory(Arc::new(factory));
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Register a callback on the raw input
    pub fn before<F>(mut self, func: F) -> Self
    where
        F: Fn(Value, &FieldContext<'_>) -> Result<Value, ConstraintError> + Send + Sync + 'static,
    {
        self.validators
            .push(FieldValidator::new(ValidatorMode::Before, func));
        self
    }

    /// Register a callback on the coerced and constrained value
    pub fn after<F>(mut self, func: F) -> Self
    where
        F: Fn(Value, &FieldContext<'_>) -> Result<Value, ConstraintError> + Send + Sync + 'static,
    {
        self.validators
            .push(FieldValidator::new(ValidatorMode::After, func));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn default(&self) -> &DefaultValue {
        &self.default
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The key this field is read from in input mappings
    pub fn input_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_required(&self) -> bool {
        self.default.is_required()
    }

    /// Callbacks of the given mode, in registration order
    pub fn validators(&self, mode: ValidatorMode) -> impl Iterator<Item = &FieldValidator> {
        self.validators.iter().filter(move |v| v.mode == mode)
    }
}

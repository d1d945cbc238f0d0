//! Schema subsystem
//!
//! Schemas are declared once, checked structurally at definition time and
//! frozen into a [`Registry`] before any record is validated.
//!
//! # Design Principles
//!
//! - Inheritance flattened at definition time
//! - Schema errors surface immediately, never during validation
//! - A resolved registry is immutable and shared read-only

mod definition;
mod errors;
mod field;
mod loader;
mod registry;
mod types;

pub use definition::{
    ExtraPolicy, FieldSpec, ModelValidator, ModelValidatorFn, Schema, SchemaConfig, SchemaDef,
    SchemaSpec,
};
pub use errors::{SchemaError, SchemaResult};
pub use field::{
    DefaultFactoryFn, DefaultValue, FieldContext, FieldDef, FieldValidator, FieldValidatorFn,
    ValidatorMode,
};
pub use loader::SchemaLoader;
pub use registry::{Registry, SchemaRegistry};
pub use types::{Constraint, FieldType, Literal, Pattern};

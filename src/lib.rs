//! aeromodel - declarative record validation
//!
//! Schemas are declared as ordered field lists, registered in a
//! [`SchemaRegistry`] and frozen into a shareable [`Registry`]. Raw input
//! (JSON or [`Value`] maps) is coerced and checked into a [`Record`];
//! every failure is collected into one [`ValidationError`].
//!
//! ```ignore
//! use aeromodel::{Constraint, FieldDef, SchemaDef, SchemaRegistry};
//!
//! let mut registry = SchemaRegistry::new();
//! registry.define(
//!     SchemaDef::new("User")
//!         .field(FieldDef::required_string("name"))
//!         .field(FieldDef::required_int("age").with_constraints([Constraint::Ge(0.0), Constraint::Le(120.0)])),
//! )?;
//! let registry = registry.resolve()?;
//! let user = registry.validate_json("User", r#"{"name": "ada", "age": "36"}"#)?;
//! ```

pub mod cli;
pub mod coerce;
pub mod error;
pub mod json_schema;
pub mod model;
pub mod observability;
pub mod record;
pub mod schema;
pub mod serialize;
pub mod settings;
pub mod validate;
pub mod value;

pub use error::{Error, Result};
pub use model::Model;
pub use record::Record;
pub use schema::{
    Constraint, ExtraPolicy, FieldContext, FieldDef, FieldType, Literal, Registry, SchemaConfig,
    SchemaDef, SchemaError, SchemaLoader, SchemaRegistry,
};
pub use serialize::{dump, dump_json, dump_json_pretty, DumpOptions};
pub use settings::{SettingsError, SettingsSource};
pub use validate::{
    CoercionError, ConstraintError, ErrorKind, FieldIssue, FieldPath, ModelError, ValidationError,
};
pub use value::Value;

//! Record validation
//!
//! Runs each field through its pipeline (before-callbacks, coercion,
//! constraints, after-callbacks), then the whole-record validators, and
//! collects every issue into one [`ValidationError`].

mod constraints;
mod errors;
mod validator;

pub use constraints::validate_field;
pub use errors::{
    CoercionError, ConstraintError, ErrorKind, FieldIssue, FieldPath, ModelError, PathSegment,
    ValidationError,
};
pub use validator::{validate_record, SchemaValidator};
pub(crate) use validator::{run_field, run_model_validators};

//! Schema definition errors
//!
//! Every variant is detected while defining, resolving or loading schemas.
//! They indicate a programming mistake rather than bad input data, so they
//! are surfaced immediately instead of being collected.
//!
//! Error codes:
//! - AERO_SCHEMA_ALREADY_DEFINED
//! - AERO_SCHEMA_DUPLICATE_FIELD
//! - AERO_SCHEMA_ALIAS_COLLISION
//! - AERO_SCHEMA_UNKNOWN_PARENT
//! - AERO_SCHEMA_INCOMPATIBLE_FIELD
//! - AERO_SCHEMA_INVALID_CONSTRAINT
//! - AERO_SCHEMA_INVALID_PATTERN
//! - AERO_SCHEMA_CYCLIC_REFERENCE
//! - AERO_SCHEMA_UNRESOLVED_REFERENCE
//! - AERO_SCHEMA_UNKNOWN
//! - AERO_SCHEMA_MALFORMED

use thiserror::Error;

/// Schema definition error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema '{0}' is already defined")]
    AlreadyDefined(String),

    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("schema '{schema}': alias '{alias}' of field '{field}' collides with another field")]
    AliasCollision {
        schema: String,
        field: String,
        alias: String,
    },

    #[error("schema '{schema}' extends unknown schema '{parent}'")]
    UnknownParent { schema: String, parent: String },

    #[error(
        "schema '{schema}': field '{field}' is inherited as {first} and as {second}"
    )]
    IncompatibleField {
        schema: String,
        field: String,
        first: String,
        second: String,
    },

    #[error("schema '{schema}': constraint '{constraint}' does not apply to field '{field}' of type {field_type}")]
    InvalidConstraint {
        schema: String,
        field: String,
        constraint: String,
        field_type: String,
    },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("schema '{schema}': field '{field}' closes the reference cycle {cycle}; mark the reference lazy")]
    CyclicReference {
        schema: String,
        field: String,
        cycle: String,
    },

    #[error("schema '{schema}': field '{field}' references undefined schema '{target}'")]
    UnresolvedReference {
        schema: String,
        field: String,
        target: String,
    },

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("malformed schema file '{path}': {reason}")]
    Malformed { path: String, reason: String },
}

impl SchemaError {
    /// Create an error for a malformed schema file
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::AlreadyDefined(_) => "AERO_SCHEMA_ALREADY_DEFINED",
            SchemaError::DuplicateField { .. } => "AERO_SCHEMA_DUPLICATE_FIELD",
            SchemaError::AliasCollision { .. } => "AERO_SCHEMA_ALIAS_COLLISION",
            SchemaError::UnknownParent { .. } => "AERO_SCHEMA_UNKNOWN_PARENT",
            SchemaError::IncompatibleField { .. } => "AERO_SCHEMA_INCOMPATIBLE_FIELD",
            SchemaError::InvalidConstraint { .. } => "AERO_SCHEMA_INVALID_CONSTRAINT",
            SchemaError::InvalidPattern { .. } => "AERO_SCHEMA_INVALID_PATTERN",
            SchemaError::CyclicReference { .. } => "AERO_SCHEMA_CYCLIC_REFERENCE",
            SchemaError::UnresolvedReference { .. } => "AERO_SCHEMA_UNRESOLVED_REFERENCE",
            SchemaError::UnknownSchema(_) => "AERO_SCHEMA_UNKNOWN",
            SchemaError::Malformed { .. } => "AERO_SCHEMA_MALFORMED",
        }
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SchemaError::AlreadyDefined("users".into()).code(),
            "AERO_SCHEMA_ALREADY_DEFINED"
        );
        assert_eq!(
            SchemaError::malformed("a.json", "bad").code(),
            "AERO_SCHEMA_MALFORMED"
        );
    }

    #[test]
    fn test_display_names_schema_and_field() {
        let err = SchemaError::UnresolvedReference {
            schema: "Tree".into(),
            field: "children".into(),
            target: "Node".into(),
        };
        let display = err.to_string();
        assert!(display.contains("Tree"));
        assert!(display.contains("children"));
        assert!(display.contains("Node"));
    }
}

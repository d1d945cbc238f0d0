//! Validation errors
//!
//! A single validation attempt collects every problem it finds into one
//! [`ValidationError`]. Each [`FieldIssue`] carries the path of the
//! offending value, a kind with a stable code, and a human-readable message.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Location of a value inside a record.
///
/// Renders as `address.city`, `tags[1]` or `labels[env]`; the empty path is
/// the record itself and renders as `$root`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Field(name.into())])
    }

    pub fn index(index: usize) -> Self {
        Self(vec![PathSegment::Index(index)])
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(key.into())])
    }

    /// Prepends `prefix` to this path.
    pub fn under(mut self, prefix: &FieldPath) -> Self {
        let mut segments = prefix.0.clone();
        segments.append(&mut self.0);
        self.0 = segments;
        self
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$root");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
                PathSegment::Key(key) => write!(f, "[{}]", key)?,
            }
        }
        Ok(())
    }
}

/// Category of a field issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required field absent from input
    Missing,
    /// Undeclared key under `ExtraPolicy::Forbid`
    ExtraForbidden,
    /// Value could not be converted to the declared type
    Coercion { expected: String, received: String },
    /// Built-in constraint or field callback rejected the value
    Constraint { constraint: String },
    /// Whole-record callback rejected the record
    Model,
    /// Assignment on a frozen record
    Frozen,
    /// Input text is not valid JSON
    InvalidJson,
}

impl ErrorKind {
    /// Returns the stable code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Missing => "missing",
            ErrorKind::ExtraForbidden => "extra_forbidden",
            ErrorKind::Coercion { .. } => "coercion",
            ErrorKind::Constraint { .. } => "constraint",
            ErrorKind::Model => "model",
            ErrorKind::Frozen => "frozen",
            ErrorKind::InvalidJson => "invalid_json",
        }
    }
}

/// One problem found during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: FieldPath,
    pub kind: ErrorKind,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: FieldPath, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    pub fn missing(path: FieldPath) -> Self {
        Self::new(path, ErrorKind::Missing, "field required")
    }

    pub fn extra_forbidden(path: FieldPath) -> Self {
        Self::new(path, ErrorKind::ExtraForbidden, "extra inputs are not permitted")
    }

    pub fn coercion(path: FieldPath, err: CoercionError) -> Self {
        let message = err.to_string();
        Self::new(
            path,
            ErrorKind::Coercion {
                expected: err.expected,
                received: err.received,
            },
            message,
        )
    }

    pub fn constraint(path: FieldPath, err: ConstraintError) -> Self {
        Self::new(
            path,
            ErrorKind::Constraint {
                constraint: err.constraint,
            },
            err.message,
        )
    }

    pub fn model(err: ModelError) -> Self {
        Self::new(FieldPath::root(), ErrorKind::Model, err.message)
    }

    pub fn frozen(path: FieldPath) -> Self {
        Self::new(path, ErrorKind::Frozen, "instance is frozen")
    }

    /// Moves the issue under `prefix`.
    pub fn under(mut self, prefix: &FieldPath) -> Self {
        self.path = self.path.under(prefix);
        self
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.path, self.message, self.kind.code())
    }
}

impl Serialize for FieldIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FieldIssue", 3)?;
        state.serialize_field("path", &self.path.to_string())?;
        state.serialize_field("kind", self.kind.code())?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

/// Every issue found while validating one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    schema: String,
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(schema: impl Into<String>, issues: Vec<FieldIssue>) -> Self {
        Self {
            schema: schema.into(),
            issues,
        }
    }

    /// Name of the schema that rejected the input
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Issues in the order they were found
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<FieldIssue> {
        self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues whose path renders as `path`
    pub fn issues_at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldIssue> {
        self.issues
            .iter()
            .filter(move |issue| issue.path.to_string() == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.issues.len() == 1 {
            "error"
        } else {
            "errors"
        };
        write!(
            f,
            "{} validation {} for {}",
            self.issues.len(),
            noun,
            self.schema
        )?;
        for issue in &self.issues {
            write!(f, "\n  {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A value could not be converted to its declared type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, received {received}")]
pub struct CoercionError {
    pub expected: String,
    pub received: String,
}

impl CoercionError {
    pub fn new(expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            received: received.into(),
        }
    }
}

/// A constraint or field callback rejected a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConstraintError {
    pub constraint: String,
    pub message: String,
}

impl ConstraintError {
    pub fn new(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Error raised by a user field callback
    pub fn custom(message: impl Into<String>) -> Self {
        Self::new("callback", message)
    }
}

/// A whole-record callback rejected the record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ModelError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ModelError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_rendering() {
        assert_eq!(FieldPath::root().to_string(), "$root");
        assert_eq!(FieldPath::field("age").to_string(), "age");

        let path = FieldPath::field("city").under(&FieldPath::field("address"));
        assert_eq!(path.to_string(), "address.city");

        let path = FieldPath::index(1).under(&FieldPath::field("tags"));
        assert_eq!(path.to_string(), "tags[1]");

        let path = FieldPath::field("name")
            .under(&FieldPath::index(0))
            .under(&FieldPath::field("items"));
        assert_eq!(path.to_string(), "items[0].name");

        let path = FieldPath::key("env").under(&FieldPath::field("labels"));
        assert_eq!(path.to_string(), "labels[env]");
    }

    #[test]
    fn test_issue_codes() {
        let issue = FieldIssue::coercion(
            FieldPath::field("age"),
            CoercionError::new("int", "string"),
        );
        assert_eq!(issue.kind.code(), "coercion");
        assert_eq!(issue.message, "expected int, received string");

        assert_eq!(FieldIssue::missing(FieldPath::field("a")).kind.code(), "missing");
        assert_eq!(
            FieldIssue::model(ModelError::from("bad")).path,
            FieldPath::root()
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(
            "User",
            vec![
                FieldIssue::missing(FieldPath::field("name")),
                FieldIssue::constraint(
                    FieldPath::field("age"),
                    ConstraintError::new("le", "value must be <= 120"),
                ),
            ],
        );
        let text = err.to_string();
        assert!(text.starts_with("2 validation errors for User"));
        assert!(text.contains("age: value must be <= 120 [constraint]"));
        assert_eq!(err.issues_at("name").count(), 1);
    }

    #[test]
    fn test_issue_serializes_flat() {
        let issue = FieldIssue::frozen(FieldPath::field("id"));
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": "id", "kind": "frozen", "message": "instance is frozen"})
        );
    }
}

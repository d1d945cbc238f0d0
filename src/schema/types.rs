//! Declared field types and constraints
//!
//! Supported types:
//! - string, int, float, bool
//! - date, time, datetime, duration, uuid
//! - any (passes through untouched)
//! - optional: null or the inner type
//! - list, set, map: homogeneous collections
//! - nested: another schema, referenced by name (eager or lazy)
//! - union: members tried left-to-right
//! - literal: one of a fixed set of scalar values
//! - secret: the inner type, masked on output

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::{SchemaError, SchemaResult};
use crate::value::Value;

/// Declared field type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time with a fixed UTC offset
    DateTime,
    /// Signed time span
    Duration,
    /// RFC 4122 UUID
    Uuid,
    /// Any value, unchecked
    Any,
    /// Null or the inner type
    Optional { inner: Box<FieldType> },
    /// Ordered sequence
    List { items: Box<FieldType> },
    /// Ordered sequence without duplicates
    Set { items: Box<FieldType> },
    /// String-keyed mapping
    Map { values: Box<FieldType> },
    /// Embedded record of another schema.
    ///
    /// Lazy references may point at schemas defined later (or at the
    /// schema itself); they are checked by `SchemaRegistry::resolve`.
    Nested {
        schema: String,
        #[serde(default)]
        lazy: bool,
    },
    /// First member that coerces successfully wins
    Union { members: Vec<FieldType> },
    /// Exactly one of the listed values
    Literal { values: Vec<Literal> },
    /// Inner type, masked on output
    Secret { inner: Box<FieldType> },
}

impl FieldType {
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn list(items: FieldType) -> Self {
        FieldType::List {
            items: Box::new(items),
        }
    }

    pub fn set(items: FieldType) -> Self {
        FieldType::Set {
            items: Box::new(items),
        }
    }

    pub fn map(values: FieldType) -> Self {
        FieldType::Map {
            values: Box::new(values),
        }
    }

    /// Eager reference to an already defined schema
    pub fn nested(schema: impl Into<String>) -> Self {
        FieldType::Nested {
            schema: schema.into(),
            lazy: false,
        }
    }

    /// Forward reference, checked at resolve time
    pub fn lazy(schema: impl Into<String>) -> Self {
        FieldType::Nested {
            schema: schema.into(),
            lazy: true,
        }
    }

    pub fn union(members: Vec<FieldType>) -> Self {
        FieldType::Union { members }
    }

    pub fn literal(values: Vec<Literal>) -> Self {
        FieldType::Literal { values }
    }

    pub fn secret(inner: FieldType) -> Self {
        FieldType::Secret {
            inner: Box::new(inner),
        }
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> String {
        match self {
            FieldType::String => "string".into(),
            FieldType::Int => "int".into(),
            FieldType::Float => "float".into(),
            FieldType::Bool => "bool".into(),
            FieldType::Date => "date".into(),
            FieldType::Time => "time".into(),
            FieldType::DateTime => "datetime".into(),
            FieldType::Duration => "duration".into(),
            FieldType::Uuid => "uuid".into(),
            FieldType::Any => "any".into(),
            FieldType::Optional { inner } => format!("optional[{}]", inner.type_name()),
            FieldType::List { items } => format!("list[{}]", items.type_name()),
            FieldType::Set { items } => format!("set[{}]", items.type_name()),
            FieldType::Map { values } => format!("map[{}]", values.type_name()),
            FieldType::Nested { schema, .. } => schema.clone(),
            FieldType::Union { members } => members
                .iter()
                .map(FieldType::type_name)
                .collect::<Vec<_>>()
                .join(" | "),
            FieldType::Literal { values } => format!(
                "literal[{}]",
                values
                    .iter()
                    .map(Literal::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            FieldType::Secret { inner } => format!("secret[{}]", inner.type_name()),
        }
    }

    /// Strips `optional` and `secret` wrappers.
    pub fn base(&self) -> &FieldType {
        match self {
            FieldType::Optional { inner } | FieldType::Secret { inner } => inner.base(),
            other => other,
        }
    }

    /// Name of the schema this type embeds, looking through wrappers.
    pub fn nested_schema(&self) -> Option<&str> {
        match self.base() {
            FieldType::Nested { schema, .. } => Some(schema),
            _ => None,
        }
    }

    /// Collects every nested reference as `(schema, lazy)`.
    pub fn references(&self) -> Vec<(&str, bool)> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<(&'a str, bool)>) {
        match self {
            FieldType::Nested { schema, lazy } => out.push((schema.as_str(), *lazy)),
            FieldType::Optional { inner } | FieldType::Secret { inner } => {
                inner.collect_references(out)
            }
            FieldType::List { items } | FieldType::Set { items } => items.collect_references(out),
            FieldType::Map { values } => values.collect_references(out),
            FieldType::Union { members } => {
                for member in members {
                    member.collect_references(out);
                }
            }
            _ => {}
        }
    }

    /// Whether values of this type are structured (list, set, map, record).
    pub fn is_structured(&self) -> bool {
        match self.base() {
            FieldType::List { .. }
            | FieldType::Set { .. }
            | FieldType::Map { .. }
            | FieldType::Nested { .. } => true,
            FieldType::Union { members } => members.iter().any(FieldType::is_structured),
            _ => false,
        }
    }

    /// Whether any alternative of this type can hold a value of `kind`.
    fn admits(&self, kind: &dyn Fn(&FieldType) -> bool) -> bool {
        match self.base() {
            FieldType::Union { members } => members.iter().any(|m| m.admits(kind)),
            FieldType::Any => true,
            other => kind(other),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A scalar literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Literal {
    /// Exact match against a value, no coercion.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            (Literal::Int(a), Value::Int(b)) => a == b,
            (Literal::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Str(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

/// A compiled regular expression, serialized as its source text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> SchemaResult<Self> {
        let source = source.into();
        let regex = Regex::new(&source).map_err(|e| SchemaError::InvalidPattern {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Searches anywhere in the text.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.source)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(source).map_err(serde::de::Error::custom)
    }
}

/// Per-field constraint.
///
/// Transforms (`strip_whitespace`, `to_lower`, `to_upper`) are applied
/// before any check and never fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Gt(f64),
    Ge(f64),
    Lt(f64),
    Le(f64),
    MultipleOf(f64),
    MinLength(usize),
    MaxLength(usize),
    Pattern(Pattern),
    OneOf(Vec<Literal>),
    StripWhitespace,
    ToLower,
    ToUpper,
}

impl Constraint {
    /// Compiles a pattern constraint.
    pub fn pattern(source: impl Into<String>) -> SchemaResult<Self> {
        Pattern::new(source).map(Constraint::Pattern)
    }

    /// Returns the constraint name used in error kinds
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Gt(_) => "gt",
            Constraint::Ge(_) => "ge",
            Constraint::Lt(_) => "lt",
            Constraint::Le(_) => "le",
            Constraint::MultipleOf(_) => "multiple_of",
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Pattern(_) => "pattern",
            Constraint::OneOf(_) => "one_of",
            Constraint::StripWhitespace => "strip_whitespace",
            Constraint::ToLower => "to_lower",
            Constraint::ToUpper => "to_upper",
        }
    }

    /// Whether this constraint transforms rather than checks.
    pub fn is_transform(&self) -> bool {
        matches!(
            self,
            Constraint::StripWhitespace | Constraint::ToLower | Constraint::ToUpper
        )
    }

    /// Whether the constraint can apply to values of the given type.
    pub fn applies_to(&self, field_type: &FieldType) -> bool {
        match self {
            Constraint::Gt(b) | Constraint::Ge(b) | Constraint::Lt(b) | Constraint::Le(b) => {
                b.is_finite() && field_type.admits(&is_numeric)
            }
            Constraint::MultipleOf(m) => {
                m.is_finite() && *m > 0.0 && field_type.admits(&is_numeric)
            }
            Constraint::MinLength(_) | Constraint::MaxLength(_) => {
                field_type.admits(&|t: &FieldType| {
                    matches!(
                        t,
                        FieldType::String
                            | FieldType::List { .. }
                            | FieldType::Set { .. }
                            | FieldType::Map { .. }
                    )
                })
            }
            Constraint::Pattern(_)
            | Constraint::StripWhitespace
            | Constraint::ToLower
            | Constraint::ToUpper => {
                field_type.admits(&|t: &FieldType| matches!(t, FieldType::String))
            }
            Constraint::OneOf(values) => !values.is_empty(),
        }
    }
}

fn is_numeric(t: &FieldType) -> bool {
    matches!(t, FieldType::Int | FieldType::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::Int.type_name(), "int");
        assert_eq!(FieldType::optional(FieldType::Int).type_name(), "optional[int]");
        assert_eq!(
            FieldType::union(vec![FieldType::Int, FieldType::String]).type_name(),
            "int | string"
        );
        assert_eq!(FieldType::nested("Address").type_name(), "Address");
        assert_eq!(
            FieldType::literal(vec!["a".into(), 1.into()]).type_name(),
            "literal['a', 1]"
        );
    }

    #[test]
    fn test_field_type_serde_tagged() {
        let ty: FieldType = serde_json::from_str(
            r#"{"type": "list", "items": {"type": "nested", "schema": "Tag"}}"#,
        )
        .unwrap();
        assert_eq!(ty, FieldType::list(FieldType::nested("Tag")));

        let ty: FieldType = serde_json::from_str(r#"{"type": "datetime"}"#).unwrap();
        assert_eq!(ty, FieldType::DateTime);
    }

    #[test]
    fn test_references_look_through_wrappers() {
        let ty = FieldType::optional(FieldType::list(FieldType::union(vec![
            FieldType::nested("A"),
            FieldType::lazy("B"),
        ])));
        assert_eq!(ty.references(), vec![("A", false), ("B", true)]);
    }

    #[test]
    fn test_constraint_applicability() {
        assert!(Constraint::Ge(0.0).applies_to(&FieldType::Int));
        assert!(Constraint::Ge(0.0).applies_to(&FieldType::optional(FieldType::Float)));
        assert!(!Constraint::Ge(0.0).applies_to(&FieldType::String));
        assert!(Constraint::MaxLength(3).applies_to(&FieldType::list(FieldType::Int)));
        assert!(!Constraint::pattern("^a").unwrap().applies_to(&FieldType::Int));
        assert!(Constraint::ToLower.applies_to(&FieldType::secret(FieldType::String)));
        assert!(!Constraint::MultipleOf(0.0).applies_to(&FieldType::Int));
    }

    #[test]
    fn test_pattern_serde() {
        let c: Constraint = serde_json::from_str(r#"{"pattern": "^[a-z]+$"}"#).unwrap();
        match &c {
            Constraint::Pattern(p) => assert!(p.is_match("abc")),
            other => panic!("unexpected constraint {:?}", other),
        }
        assert_eq!(serde_json::to_string(&c).unwrap(), r#"{"pattern":"^[a-z]+$"}"#);

        let bad: Result<Constraint, _> = serde_json::from_str(r#"{"pattern": "("}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_literal_matches_exactly() {
        assert!(Literal::Int(5).matches(&Value::Int(5)));
        assert!(!Literal::Int(5).matches(&Value::Str("5".into())));
        assert!(Literal::from("red").matches(&Value::Str("red".into())));
    }
}

//! Dynamic value model
//!
//! Every value that flows through coercion, constraint checks, records and
//! serialization is a [`Value`]. Raw JSON converts into the JSON-shaped
//! subset (`Null`, `Bool`, `Int`, `Float`, `Str`, `List`, `Map`); the richer
//! variants are only ever produced by the coercion engine.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::record::Record;

/// Text rendered in place of a secret value.
pub const SECRET_MASK: &str = "**********";

/// A validated or raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<FixedOffset>),
    Duration(Duration),
    Uuid(Uuid),
    List(Vec<Value>),
    /// Ordered, de-duplicated collection
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(Box<Record>),
    Secret(SecretValue),
}

impl Value {
    /// Converts raw JSON into a value.
    ///
    /// Integral numbers that fit `i64` become `Int`, every other number
    /// becomes `Float`.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Projects the value to JSON with default dump options (secrets masked).
    pub fn to_json(&self) -> serde_json::Value {
        crate::serialize::value_to_json(self, &crate::serialize::DumpOptions::default())
    }

    /// Returns the type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Uuid(_) => "uuid",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Secret(_) => "secret",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Float` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Elements of a list or set.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the wrapped value of a secret, or the value itself.
    pub fn reveal(&self) -> &Value {
        match self {
            Value::Secret(secret) => secret.expose(),
            other => other,
        }
    }

    /// Wraps a value as a secret.
    pub fn secret(inner: impl Into<Value>) -> Self {
        Value::Secret(SecretValue::new(inner.into()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// A value whose contents never appear in `Debug` output or default dumps.
#[derive(Clone, PartialEq)]
pub struct SecretValue(Box<Value>);

impl SecretValue {
    pub fn new(inner: Value) -> Self {
        Self(Box::new(inner))
    }

    /// Returns the wrapped value.
    pub fn expose(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        *self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue({})", SECRET_MASK)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Box::new(record))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(&json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Formats a duration as an ISO 8601 duration (`P1DT2H3M4.5S`).
pub fn format_duration(duration: &Duration) -> String {
    let negative = *duration < Duration::zero();
    let abs = if negative { -*duration } else { *duration };

    let total_secs = abs.num_seconds();
    let nanos = (abs - Duration::seconds(total_secs))
        .num_nanoseconds()
        .unwrap_or(0);

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }

    let mut time = String::new();
    if hours > 0 {
        time.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        time.push_str(&format!("{}M", minutes));
    }
    if seconds > 0 || nanos > 0 {
        time.push_str(&seconds.to_string());
        if nanos > 0 {
            let frac = format!("{:09}", nanos);
            time.push('.');
            time.push_str(frac.trim_end_matches('0'));
        }
        time.push('S');
    }

    if !time.is_empty() {
        out.push('T');
        out.push_str(&time);
    } else if days == 0 {
        out.push_str("T0S");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(Value::from_json(&json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(&json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from_json(&json!(1.0)), Value::Float(1.0));
        assert_eq!(
            Value::from_json(&json!(u64::MAX)),
            Value::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn test_from_json_nested() {
        let value = Value::from_json(&json!({"tags": ["a", "b"], "n": null}));
        let map = value.as_map().unwrap();
        assert_eq!(map["tags"].as_list().unwrap().len(), 2);
        assert!(map["n"].is_null());
    }

    #[test]
    fn test_secret_debug_is_masked() {
        let value = Value::secret("hunter2");
        let debug = format!("{:?}", value);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains(SECRET_MASK));
        assert_eq!(value.reveal().as_str(), Some("hunter2"));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Str("x".into()).type_name(), "string");
        assert_eq!(Value::Set(vec![]).type_name(), "set");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(&Duration::zero()), "PT0S");
        assert_eq!(format_duration(&Duration::seconds(90)), "PT1M30S");
        assert_eq!(format_duration(&Duration::days(2)), "P2D");
        assert_eq!(
            format_duration(&(Duration::days(1) + Duration::hours(2) + Duration::milliseconds(500))),
            "P1DT2H0.5S"
        );
        assert_eq!(format_duration(&-Duration::minutes(5)), "-PT5M");
    }
}

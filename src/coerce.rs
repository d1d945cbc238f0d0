//! Coercion engine
//!
//! Converts raw values to declared types. Deterministic and side-effect
//! free: the same input and type always produce the same result, and
//! coercing an already-coerced value returns it unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::schema::{FieldType, Registry, Schema};
use crate::validate::{validate_record, CoercionError, FieldIssue, FieldPath};
use crate::value::Value;

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Coerces a value to a scalar type.
///
/// Structured types (collections, nested, union, literal) are handled by
/// [`Coercer`]; passing one here is a coercion error.
pub fn coerce_scalar(raw: &Value, ty: &FieldType) -> Result<Value, CoercionError> {
    let fail = || CoercionError::new(ty.type_name(), describe(raw));
    match ty {
        FieldType::Any => Ok(raw.clone()),
        FieldType::String => match raw {
            Value::Str(_) => Ok(raw.clone()),
            _ => Err(fail()),
        },
        FieldType::Int => coerce_int(raw).ok_or_else(fail),
        FieldType::Float => coerce_float(raw).ok_or_else(fail),
        FieldType::Bool => coerce_bool(raw).ok_or_else(fail),
        FieldType::Date => match raw {
            Value::Date(_) => Ok(raw.clone()),
            Value::Str(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| fail()),
            _ => Err(fail()),
        },
        FieldType::Time => match raw {
            Value::Time(_) => Ok(raw.clone()),
            Value::Str(s) => parse_time(s.trim()).map(Value::Time).ok_or_else(fail),
            _ => Err(fail()),
        },
        FieldType::DateTime => coerce_datetime(raw).ok_or_else(fail),
        FieldType::Duration => coerce_duration(raw).ok_or_else(fail),
        FieldType::Uuid => match raw {
            Value::Uuid(_) => Ok(raw.clone()),
            Value::Str(s) => Uuid::parse_str(s.trim())
                .map(Value::Uuid)
                .map_err(|_| fail()),
            _ => Err(fail()),
        },
        _ => Err(fail()),
    }
}

/// Describes a raw value for error messages
fn describe(raw: &Value) -> String {
    match raw {
        Value::Record(record) => format!("record {}", record.schema_name()),
        other => other.type_name().to_string(),
    }
}

fn coerce_int(raw: &Value) -> Option<Value> {
    match raw {
        Value::Int(_) => Some(raw.clone()),
        Value::Float(f) => float_to_int(*f).map(Value::Int),
        Value::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
                .map(Value::Int)
        }
        _ => None,
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    // i64::MAX is not exactly representable; the bound is exclusive
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_float(raw: &Value) -> Option<Value> {
    let f = match raw {
        Value::Float(f) => *f,
        Value::Int(i) => *i as f64,
        Value::Str(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(Value::Float(f))
}

fn coerce_bool(raw: &Value) -> Option<Value> {
    match raw {
        Value::Bool(_) => Some(raw.clone()),
        Value::Int(0) => Some(Value::Bool(false)),
        Value::Int(1) => Some(Value::Bool(true)),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" | "y" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "f" | "n" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

fn coerce_datetime(raw: &Value) -> Option<Value> {
    match raw {
        Value::DateTime(_) => Some(raw.clone()),
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| Value::DateTime(dt.fixed_offset())),
        Value::Str(s) => parse_datetime(s.trim()).map(Value::DateTime),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    let utc = FixedOffset::east_opt(0)?;
    NAIVE_DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, utc))
    })
}

fn coerce_duration(raw: &Value) -> Option<Value> {
    let nanos = match raw {
        Value::Duration(_) => return Some(raw.clone()),
        Value::Int(secs) => i128::from(*secs) * NANOS_PER_SEC,
        Value::Float(secs) => float_seconds_to_nanos(*secs)?,
        Value::Str(s) => {
            let s = s.trim();
            match s.parse::<f64>() {
                Ok(secs) => float_seconds_to_nanos(secs)?,
                Err(_) => parse_iso_duration(s).or_else(|| parse_clock_duration(s))?,
            }
        }
        _ => return None,
    };
    nanos_to_duration(nanos).map(Value::Duration)
}

fn float_seconds_to_nanos(secs: f64) -> Option<i128> {
    let nanos = (secs * 1e9).round();
    (nanos.is_finite() && nanos.abs() < i64::MAX as f64).then_some(nanos as i128)
}

fn nanos_to_duration(nanos: i128) -> Option<Duration> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SEC)).ok()?;
    let rem = i64::try_from(nanos.rem_euclid(NANOS_PER_SEC)).ok()?;
    Duration::try_seconds(secs)?.checked_add(&Duration::nanoseconds(rem))
}

/// Parses `[-]P[nW][nD][T[nH][nM][n[.f]S]]` into nanoseconds.
fn parse_iso_duration(s: &str) -> Option<i128> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let rest = rest.strip_prefix('P').or_else(|| rest.strip_prefix('p'))?;

    let mut total: i128 = 0;
    let mut in_time = false;
    let mut components = 0;
    let mut number = String::new();
    // Rank of the last designator seen; designators must appear in order
    let mut last_rank = 0;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' if !in_time && number.is_empty() => {
                in_time = true;
                last_rank = 2;
            }
            d if d.is_ascii_digit() || d == '.' => number.push(d),
            designator => {
                let (rank, unit_nanos) = match (designator, in_time) {
                    ('W', false) => (1, 7 * 86_400 * NANOS_PER_SEC),
                    ('D', false) => (2, 86_400 * NANOS_PER_SEC),
                    ('H', true) => (3, 3_600 * NANOS_PER_SEC),
                    ('M', true) => (4, 60 * NANOS_PER_SEC),
                    ('S', true) => (5, NANOS_PER_SEC),
                    _ => return None,
                };
                if rank <= last_rank || number.is_empty() {
                    return None;
                }
                let amount = if rank == 5 {
                    decimal_to_nanos(&number)?
                } else {
                    number.parse::<i128>().ok()?.checked_mul(unit_nanos)?
                };
                total = total.checked_add(amount)?;
                last_rank = rank;
                components += 1;
                number.clear();
            }
        }
    }

    // A trailing number without a designator, or nothing at all, is invalid
    if !number.is_empty() || components == 0 {
        return None;
    }
    // 'T' must be followed by at least one time component
    if in_time && last_rank == 2 {
        return None;
    }
    Some(if negative { -total } else { total })
}

/// Parses `n[.f]` seconds into nanoseconds without going through floats.
fn decimal_to_nanos(text: &str) -> Option<i128> {
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };
    if !is_digits(whole) || frac.len() > 9 || !(frac.is_empty() || is_digits(frac)) {
        return None;
    }
    let whole: i128 = whole.parse().ok()?;
    let frac_nanos: i128 = if frac.is_empty() {
        0
    } else {
        format!("{:0<9}", frac).parse().ok()?
    };
    whole.checked_mul(NANOS_PER_SEC)?.checked_add(frac_nanos)
}

/// Parses `[-][HH:]MM:SS[.f]` into nanoseconds.
fn parse_clock_duration(s: &str) -> Option<i128> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let parts: Vec<&str> = rest.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return None,
    };
    // Only the leading '-' carries a sign
    if !is_digits(hours) || !is_digits(minutes) {
        return None;
    }
    let hours: i128 = hours.parse().ok()?;
    let minutes: i128 = minutes.parse().ok()?;
    let seconds = decimal_to_nanos(seconds)?;
    if minutes >= 60 || seconds >= 60 * NANOS_PER_SEC {
        return None;
    }
    let total = hours
        .checked_mul(3_600)?
        .checked_add(minutes * 60)?
        .checked_mul(NANOS_PER_SEC)?
        .checked_add(seconds)?;
    Some(if negative { -total } else { total })
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Coerces values of any declared type, including structured ones.
///
/// Issues are reported relative to the value being coerced; callers place
/// them under the field path.
pub struct Coercer<'r> {
    registry: &'r Registry,
}

impl<'r> Coercer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn coerce(&self, raw: &Value, ty: &FieldType) -> Result<Value, Vec<FieldIssue>> {
        match ty {
            FieldType::Optional { inner } => match raw {
                Value::Null => Ok(Value::Null),
                _ => self.coerce(raw, inner),
            },
            FieldType::Secret { inner } => {
                let coerced = self.coerce(raw.reveal(), inner)?;
                Ok(Value::secret(coerced))
            }
            FieldType::List { items } => match raw {
                Value::List(elements) | Value::Set(elements) => {
                    self.coerce_elements(elements, items).map(Value::List)
                }
                _ => Err(self.mismatch(raw, ty)),
            },
            FieldType::Set { items } => match raw {
                Value::List(elements) | Value::Set(elements) => {
                    let coerced = self.coerce_elements(elements, items)?;
                    let mut unique: Vec<Value> = Vec::with_capacity(coerced.len());
                    for value in coerced {
                        if !unique.contains(&value) {
                            unique.push(value);
                        }
                    }
                    Ok(Value::Set(unique))
                }
                _ => Err(self.mismatch(raw, ty)),
            },
            FieldType::Map { values } => match raw {
                Value::Map(entries) => self.coerce_entries(entries, values).map(Value::Map),
                _ => Err(self.mismatch(raw, ty)),
            },
            FieldType::Nested { schema, .. } => self.coerce_nested(raw, schema, ty),
            FieldType::Union { members } => {
                for member in members {
                    if let Ok(value) = self.coerce(raw, member) {
                        return Ok(value);
                    }
                }
                Err(self.mismatch(raw, ty))
            }
            FieldType::Literal { values } => {
                if values.iter().any(|lit| lit.matches(raw)) {
                    Ok(raw.clone())
                } else {
                    Err(self.mismatch(raw, ty))
                }
            }
            scalar => coerce_scalar(raw, scalar)
                .map_err(|e| vec![FieldIssue::coercion(FieldPath::root(), e)]),
        }
    }

    fn coerce_elements(&self, elements: &[Value], ty: &FieldType) -> Result<Vec<Value>, Vec<FieldIssue>> {
        let mut out = Vec::with_capacity(elements.len());
        let mut issues = Vec::new();
        for (i, element) in elements.iter().enumerate() {
            match self.coerce(element, ty) {
                Ok(value) => out.push(value),
                Err(errs) => {
                    let at = FieldPath::index(i);
                    issues.extend(errs.into_iter().map(|issue| issue.under(&at)));
                }
            }
        }
        if issues.is_empty() {
            Ok(out)
        } else {
            Err(issues)
        }
    }

    fn coerce_entries(
        &self,
        entries: &BTreeMap<String, Value>,
        ty: &FieldType,
    ) -> Result<BTreeMap<String, Value>, Vec<FieldIssue>> {
        let mut out = BTreeMap::new();
        let mut issues = Vec::new();
        for (key, entry) in entries {
            match self.coerce(entry, ty) {
                Ok(value) => {
                    out.insert(key.clone(), value);
                }
                Err(errs) => {
                    let at = FieldPath::key(key.clone());
                    issues.extend(errs.into_iter().map(|issue| issue.under(&at)));
                }
            }
        }
        if issues.is_empty() {
            Ok(out)
        } else {
            Err(issues)
        }
    }

    fn coerce_nested(&self, raw: &Value, name: &str, ty: &FieldType) -> Result<Value, Vec<FieldIssue>> {
        let Some(schema) = self.registry.schema(name) else {
            return Err(self.mismatch(raw, ty));
        };
        match raw {
            Value::Record(record) if self.extends(record.schema(), name) => Ok(raw.clone()),
            Value::Map(_) => validate_record(self.registry, schema, raw).map(Value::from),
            _ => Err(self.mismatch(raw, ty)),
        }
    }

    /// Whether `schema` is `target` or inherits from it.
    fn extends(&self, schema: &Arc<Schema>, target: &str) -> bool {
        schema.name() == target
            || schema.parents().iter().any(|parent| {
                self.registry
                    .schema(parent)
                    .is_some_and(|p| self.extends(p, target))
            })
    }

    fn mismatch(&self, raw: &Value, ty: &FieldType) -> Vec<FieldIssue> {
        vec![FieldIssue::coercion(
            FieldPath::root(),
            CoercionError::new(ty.type_name(), describe(raw)),
        )]
    }
}

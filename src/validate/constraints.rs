//! Built-in constraint checks
//!
//! Transforms run first, in declaration order, then every check in
//! declaration order; the first failing check is reported. Constraints that
//! do not apply to a value's runtime type are skipped, so a `max_length` on
//! an `int | string` union only ever sees the string alternative.

use crate::schema::Constraint;
use crate::value::Value;

use super::errors::ConstraintError;

/// Relative tolerance for `multiple_of` on floats
const MULTIPLE_EPSILON: f64 = 1e-9;

/// Applies constraints to a coerced value.
///
/// Null passes untouched. Secrets are checked on their wrapped value and
/// re-wrapped afterwards.
pub fn validate_field(value: Value, constraints: &[Constraint]) -> Result<Value, ConstraintError> {
    if constraints.is_empty() {
        return Ok(value);
    }
    match value {
        Value::Null => Ok(Value::Null),
        Value::Secret(secret) => {
            validate_field(secret.into_inner(), constraints).map(Value::secret)
        }
        mut value => {
            for constraint in constraints.iter().filter(|c| c.is_transform()) {
                value = transform(value, constraint);
            }
            for constraint in constraints.iter().filter(|c| !c.is_transform()) {
                check(&value, constraint)?;
            }
            Ok(value)
        }
    }
}

fn transform(value: Value, constraint: &Constraint) -> Value {
    match (value, constraint) {
        (Value::Str(s), Constraint::StripWhitespace) => Value::Str(s.trim().to_string()),
        (Value::Str(s), Constraint::ToLower) => Value::Str(s.to_lowercase()),
        (Value::Str(s), Constraint::ToUpper) => Value::Str(s.to_uppercase()),
        (other, _) => other,
    }
}

fn check(value: &Value, constraint: &Constraint) -> Result<(), ConstraintError> {
    let name = constraint.name();
    match constraint {
        Constraint::Gt(bound) => compare(value, name, |n| n > *bound, "greater than", *bound),
        Constraint::Ge(bound) => compare(
            value,
            name,
            |n| n >= *bound,
            "greater than or equal to",
            *bound,
        ),
        Constraint::Lt(bound) => compare(value, name, |n| n < *bound, "less than", *bound),
        Constraint::Le(bound) => compare(
            value,
            name,
            |n| n <= *bound,
            "less than or equal to",
            *bound,
        ),
        Constraint::MultipleOf(step) => {
            let numeric = matches!(value, Value::Int(_) | Value::Float(_));
            if numeric && !(step.is_finite() && *step > 0.0) {
                return Err(ConstraintError::new(
                    name,
                    format!("multiple_of step must be positive, got {}", format_number(*step)),
                ));
            }
            let ok = match value {
                Value::Int(i) if step.fract() == 0.0 && *step < i64::MAX as f64 => {
                    i.checked_rem(*step as i64) == Some(0)
                }
                Value::Int(_) | Value::Float(_) => {
                    let n = value.as_f64().unwrap_or_default();
                    let ratio = n / step;
                    (ratio - ratio.round()).abs() <= MULTIPLE_EPSILON * ratio.abs().max(1.0)
                }
                _ => true,
            };
            if ok {
                Ok(())
            } else {
                Err(ConstraintError::new(
                    name,
                    format!("value must be a multiple of {}", format_number(*step)),
                ))
            }
        }
        Constraint::MinLength(min) => match length(value) {
            Some(len) if len < *min => Err(ConstraintError::new(
                name,
                format!("length must be at least {}, got {}", min, len),
            )),
            _ => Ok(()),
        },
        Constraint::MaxLength(max) => match length(value) {
            Some(len) if len > *max => Err(ConstraintError::new(
                name,
                format!("length must be at most {}, got {}", max, len),
            )),
            _ => Ok(()),
        },
        Constraint::Pattern(pattern) => match value {
            Value::Str(s) if !pattern.is_match(s) => Err(ConstraintError::new(
                name,
                format!("string does not match pattern '{}'", pattern.as_str()),
            )),
            _ => Ok(()),
        },
        Constraint::OneOf(allowed) => {
            if allowed.iter().any(|lit| lit.matches(value)) {
                Ok(())
            } else {
                let options = allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ConstraintError::new(
                    name,
                    format!("value must be one of {}", options),
                ))
            }
        }
        Constraint::StripWhitespace | Constraint::ToLower | Constraint::ToUpper => Ok(()),
    }
}

fn compare(
    value: &Value,
    name: &str,
    ok: impl Fn(f64) -> bool,
    relation: &str,
    bound: f64,
) -> Result<(), ConstraintError> {
    match value {
        Value::Int(_) | Value::Float(_) => {
            let n = value.as_f64().unwrap_or_default();
            if ok(n) {
                Ok(())
            } else {
                Err(ConstraintError::new(
                    name,
                    format!("value must be {} {}", relation, format_number(bound)),
                ))
            }
        }
        _ => Ok(()),
    }
}

/// Characters for strings, elements for collections
fn length(value: &Value) -> Option<usize> {
    match value {
        Value::Str(s) => Some(s.chars().count()),
        Value::List(items) | Value::Set(items) => Some(items.len()),
        Value::Map(entries) => Some(entries.len()),
        _ => None,
    }
}

/// Renders integral bounds without a trailing `.0`
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

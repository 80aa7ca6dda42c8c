//! Dot-path field access and value coercions for JSON records.
//!
//! Records are arbitrary `serde_json::Value`s. A dot-path such as
//! `"metadata.author"` walks nested objects one key at a time; a numeric
//! segment indexes into an array. Any missing key or non-container on the
//! way yields `None` ("absent") rather than an error.

use serde_json::Value;
use std::cmp::Ordering;

/// Group key used for records whose group field is absent.
pub const ABSENT_KEY: &str = "undefined";

/// Resolves a dot-separated path inside `record`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use steelmind_core::records::get_path;
///
/// let record = json!({"metadata": {"author": "kel"}, "tags": ["a", "b"]});
/// assert_eq!(get_path(&record, "metadata.author"), Some(&json!("kel")));
/// assert_eq!(get_path(&record, "tags.1"), Some(&json!("b")));
/// assert_eq!(get_path(&record, "metadata.date.year"), None);
/// ```
pub fn get_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Returns true for values that count as "present and non-empty":
/// everything except `null`, `false`, `0`, `NaN` and `""`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Renders a value as plain text.
///
/// Strings render without quotes, integral numbers without a fractional
/// part, containers as compact JSON.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => format_number(f),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Text form of a possibly-absent value, used as a grouping key.
pub fn key_text(value: Option<&Value>) -> String {
    value.map(to_text).unwrap_or_else(|| ABSENT_KEY.to_string())
}

/// Coerces a value to a number.
///
/// Booleans map to 1/0, `null` to 0, numeric strings are parsed (an empty or
/// blank string is 0), and anything else is `NaN`.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Equality that treats `1` and `1.0` as the same number.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Orders two values when both are numbers or both are strings.
///
/// Mixed or non-scalar pairs are unordered.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Canonical identity of a value for distinct counting.
pub fn identity_key(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) => format!("n:{}", format_number(f)),
            None => format!("n:{}", n),
        },
        other => other.to_string(),
    }
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

//! Tolerant string-to-number conversion for fields embedded in natural
//! language ("$450,000", "2 bd", "900 sq ft").
//!
//! Ambiguous input is an explicit error, never a silent zero; the normalizer
//! decides whether a failure means skip or default.

use serde_json::Value;

/// A single field's text could not be converted to its numeric type.
///
/// Always recovered locally by the owning stage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoercionError {
    #[error("no numeric content in '{0}'")]
    NotNumeric(String),
    #[error("cannot coerce a JSON {0} to a number")]
    UnsupportedType(&'static str),
}

/// Coerce a loosely-typed JSON value to `f64`.
///
/// Numbers pass through; strings are filtered down to digits and decimal
/// points before parsing, which drops currency symbols, thousands separators,
/// and trailing unit text without any locale awareness.
pub fn coerce_f64(value: &Value) -> Result<f64, CoercionError> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| CoercionError::NotNumeric(number.to_string())),
        Value::String(text) => {
            let filtered: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if filtered.is_empty() {
                return Err(CoercionError::NotNumeric(text.clone()));
            }
            filtered
                .parse::<f64>()
                .map_err(|_| CoercionError::NotNumeric(text.clone()))
        }
        other => Err(CoercionError::UnsupportedType(kind_of(other))),
    }
}

/// Coerce a loosely-typed JSON value to `i64`.
///
/// Integers pass through, floats truncate, and strings contribute their first
/// maximal run of digits ("2 bd" becomes 2). A string with no digits fails.
pub fn coerce_i64(value: &Value) -> Result<i64, CoercionError> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(int)
            } else if let Some(float) = number.as_f64() {
                Ok(float.trunc() as i64)
            } else {
                Err(CoercionError::NotNumeric(number.to_string()))
            }
        }
        Value::String(text) => {
            let digits: String = text
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if digits.is_empty() {
                return Err(CoercionError::NotNumeric(text.clone()));
            }
            digits
                .parse::<i64>()
                .map_err(|_| CoercionError::NotNumeric(text.clone()))
        }
        other => Err(CoercionError::UnsupportedType(kind_of(other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

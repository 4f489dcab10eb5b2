//! FILENAME: src/value.rs
//! The raw input value union.
//!
//! Source records are heterogeneous: a field may hold text, an integer, or
//! a floating-point number. `RawValue` is the tagged union the whole engine
//! consumes; aggregation works on a single numeric type (`f64`) obtained
//! through `to_f64`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single raw field value from the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    Text(String),
    Int(i64),
    Float(f64),
}

/// A raw value could not be interpreted as a number.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid numeric value {0:?}")]
pub struct ConversionError(pub String);

impl RawValue {
    /// Coerces this value to `f64` for accumulation.
    ///
    /// Numeric text is accepted with either `.` or `,` as the decimal
    /// separator (the first comma is treated as a decimal point).
    pub fn to_f64(&self) -> Result<f64, ConversionError> {
        match self {
            RawValue::Int(i) => Ok(*i as f64),
            RawValue::Float(f) => Ok(*f),
            RawValue::Text(s) => {
                let normalized = s.replacen(',', ".", 1);
                normalized
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConversionError(s.clone()))
            }
        }
    }

    /// Returns the text content, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_ints_and_floats() {
        assert_eq!(RawValue::Int(4).to_f64().unwrap(), 4.0);
        assert_eq!(RawValue::Float(2.5).to_f64().unwrap(), 2.5);
    }

    #[test]
    fn parses_numeric_text_with_either_decimal_separator() {
        assert_eq!(RawValue::from("1,5").to_f64().unwrap(), 1.5);
        assert_eq!(RawValue::from("2.25").to_f64().unwrap(), 2.25);
        assert_eq!(RawValue::from(" 7 ").to_f64().unwrap(), 7.0);
    }

    #[test]
    fn rejects_non_numeric_text() {
        let err = RawValue::from("banana").to_f64().unwrap_err();
        assert_eq!(err, ConversionError("banana".to_string()));
    }

    #[test]
    fn displays_natural_text_form() {
        assert_eq!(RawValue::from("D1").to_string(), "D1");
        assert_eq!(RawValue::Int(42).to_string(), "42");
        assert_eq!(RawValue::Float(1.5).to_string(), "1.5");
    }
}

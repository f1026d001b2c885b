//! Type coercion between runtime values.
//!
//! Operators coerce the right operand to the left operand's type and method
//! calls coerce arguments to declared parameter types. Both go through a
//! [`Converter`], so an embedding application can swap in its own rules.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use num_bigint::BigInt;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

use crate::value::{Value, ValueType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("No conversion from {from} to {to}")]
    NoPath { from: ValueType, to: ValueType },

    #[error("Cannot convert '{value}' to {to}")]
    Failed { value: String, to: ValueType },
}

/// Type Coercion Service.
pub trait Converter: Send + Sync {
    /// Converts `value` to `to`. Null converts to null for every target.
    fn convert(&self, value: &Value, to: ValueType) -> Result<Value, ConversionError>;

    /// Whether any value of type `from` may convert to `to`.
    ///
    /// A `true` answer does not promise that every value converts: the
    /// string `"abc"` has a path to integer but fails to convert.
    fn can_convert(&self, from: ValueType, to: ValueType) -> bool;
}

/// Built-in conversions between the scalar types, dates and lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConverter;

impl Converter for StandardConverter {
    fn convert(&self, value: &Value, to: ValueType) -> Result<Value, ConversionError> {
        if let Value::Deferred(deferred) = value {
            let resolved = deferred.resolve().map_err(|_| failed(value, to))?;
            return self.convert(&resolved, to);
        }
        if value.is_null() || value.value_type() == to {
            return Ok(value.clone());
        }
        if !self.can_convert(value.value_type(), to) {
            return Err(ConversionError::NoPath {
                from: value.value_type(),
                to,
            });
        }

        let converted = match to {
            ValueType::String => Some(Value::String(value.to_text())),
            ValueType::Boolean => to_bool(value).map(Value::Boolean),
            ValueType::Integer => to_integer(value)
                .and_then(|n| n.to_i32())
                .map(Value::Integer),
            ValueType::Long => to_integer(value)
                .and_then(|n| n.to_i64())
                .map(Value::Long),
            ValueType::BigInteger => to_integer(value).map(Value::BigInteger),
            ValueType::Float => to_f64(value).map(Value::Float),
            ValueType::Decimal => to_decimal(value).map(Value::Decimal),
            ValueType::Date => to_date(value).map(Value::Date),
            ValueType::Array => value.to_list().map(Value::Array),
            _ => None,
        };
        converted.ok_or_else(|| failed(value, to))
    }

    fn can_convert(&self, from: ValueType, to: ValueType) -> bool {
        use ValueType::*;

        if from == to || from == Null || from == Deferred {
            return true;
        }
        match to {
            String => from.is_numeric() || matches!(from, Boolean | Date),
            Boolean => from.is_numeric() || from == String,
            Integer | Long | BigInteger | Float | Decimal => {
                from.is_numeric() || from == String || (from == Date && to != Float && to != Decimal)
            }
            Date => matches!(from, String | Integer | Long | BigInteger),
            Array => from == Sequence,
            _ => false,
        }
    }
}

fn failed(value: &Value, to: ValueType) -> ConversionError {
    ConversionError::Failed {
        value: value.to_text(),
        to,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Decimal(d) => Some(!d.is_zero()),
        other => other.as_f64().map(|n| n != 0.0),
    }
}

fn to_integer(value: &Value) -> Option<BigInt> {
    match value {
        Value::Integer(n) => Some(BigInt::from(*n)),
        Value::Long(n) => Some(BigInt::from(*n)),
        Value::BigInteger(n) => Some(n.clone()),
        Value::Float(n) if n.is_finite() => BigInt::from_f64(n.trunc()),
        Value::Decimal(d) => d.trunc().to_i128().map(BigInt::from),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<BigInt>().ok().or_else(|| {
                Decimal::from_str(s)
                    .ok()
                    .and_then(|d| d.trunc().to_i128())
                    .map(BigInt::from)
            })
        }
        Value::Date(d) => Some(BigInt::from(d.timestamp_millis())),
        _ => None,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Some(Decimal::from(*n)),
        Value::Long(n) => Some(Decimal::from(*n)),
        Value::BigInteger(n) => n.to_i128().and_then(Decimal::from_i128),
        Value::Float(n) => Decimal::from_f64(*n),
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }
}

/// RFC 3339 timestamps, plain `YYYY-MM-DD` dates (midnight UTC) and epoch milliseconds.
pub(crate) fn to_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Integer(_) | Value::Long(_) | Value::BigInteger(_) => {
            let millis = value.as_i64()?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

pub(crate) fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_narrowing_checks_range() {
        let converter = StandardConverter;
        assert_eq!(
            converter.convert(&Value::Long(7), ValueType::Integer),
            Ok(Value::Integer(7))
        );
        assert!(matches!(
            converter.convert(&Value::Long(i64::MAX), ValueType::Integer),
            Err(ConversionError::Failed { .. })
        ));
        assert_eq!(
            converter.convert(&Value::Float(2.9), ValueType::Integer),
            Ok(Value::Integer(2))
        );
        assert_eq!(
            converter.convert(&Value::from("99999999999999999999999"), ValueType::BigInteger),
            Ok(Value::BigInteger("99999999999999999999999".parse().unwrap()))
        );
    }

    #[test]
    fn test_string_conversions() {
        let converter = StandardConverter;
        assert_eq!(
            converter.convert(&Value::from("12"), ValueType::Long),
            Ok(Value::Long(12))
        );
        assert_eq!(
            converter.convert(&Value::from("TRUE"), ValueType::Boolean),
            Ok(Value::Boolean(true))
        );
        assert!(converter.convert(&Value::from("abc"), ValueType::Integer).is_err());
        assert_eq!(
            converter.convert(&Value::Float(2.0), ValueType::String),
            Ok(Value::from("2.0"))
        );
    }

    #[test]
    fn test_no_path() {
        let converter = StandardConverter;
        assert_eq!(
            converter.convert(&Value::Array(vec![]), ValueType::Integer),
            Err(ConversionError::NoPath {
                from: ValueType::Array,
                to: ValueType::Integer,
            })
        );
        assert_eq!(
            converter.convert(&Value::Null, ValueType::Integer),
            Ok(Value::Null)
        );
    }

    #[test]
    fn test_dates() {
        let converter = StandardConverter;
        let date = converter
            .convert(&Value::from("1970-01-02"), ValueType::Date)
            .unwrap();
        assert_eq!(
            converter.convert(&date, ValueType::Long),
            Ok(Value::Long(86_400_000))
        );
    }
}

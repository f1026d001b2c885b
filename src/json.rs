//! JSON <-> Value conversion, for hosts whose data arrives as JSON documents.
//!
//! # Examples
//!
//! ```
//! use pathexpr::Value;
//! use serde_json::json;
//!
//! let order = Value::from(json!({"lines": [{"sku": "a", "qty": 2}, {"sku": "b", "qty": 5}]}));
//! let big = pathexpr::parse("lines[qty > 3]/sku").unwrap();
//! assert_eq!(big.evaluate(&order).unwrap().to_json(), json!(["b"]));
//! ```

use std::str::FromStr;

use num_bigint::BigInt;
use rust_decimal::prelude::ToPrimitive;

use crate::Value;

impl From<serde_json::Value> for Value {
    /// Integers become the narrowest of `Integer`, `Long` and `BigInteger` that holds them.
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_or(Value::Long(i), Value::Integer)
                } else if let Some(u) = n.as_u64() {
                    Value::BigInteger(BigInt::from(u))
                } else {
                    n.as_f64().map_or(Value::Null, Value::Float)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Value {
    /// The JSON form of this value.
    ///
    /// Dates become RFC 3339 strings, sequences and deferred values are
    /// resolved, and values JSON can't hold (non-finite floats, functions)
    /// become null. Host objects serialize their listed fields.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Long(i) => serde_json::Value::Number((*i).into()),
            Value::BigInteger(i) => match i.to_i64() {
                Some(n) => serde_json::Value::Number(n.into()),
                None => i.to_f64().map_or(serde_json::Value::Null, float_json),
            },
            Value::Float(f) => float_json(*f),
            Value::Decimal(d) => serde_json::Number::from_str(&d.normalize().to_string())
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| d.to_f64().map_or(serde_json::Value::Null, float_json)),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Sequence(sequence) => {
                serde_json::Value::Array(sequence.iter().map(|v| v.to_json()).collect())
            }
            Value::Object(map) => {
                serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            Value::Deferred(deferred) => deferred
                .resolve()
                .map_or(serde_json::Value::Null, |v| v.to_json()),
            Value::Function(_) => serde_json::Value::Null,
            Value::Host(host) => serde_json::Value::Object(
                host.field_names()
                    .into_iter()
                    .map(|name| {
                        let value = host.field(&name).map_or(serde_json::Value::Null, |v| v.to_json());
                        (name, value)
                    })
                    .collect(),
            ),
        }
    }
}

fn float_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_numbers_pick_narrowest_type() {
        assert_eq!(Value::from(json!(7)), Value::Integer(7));
        assert_eq!(Value::from(json!(5_000_000_000i64)), Value::Long(5_000_000_000));
        assert_eq!(Value::from(json!(u64::MAX)), Value::BigInteger(BigInt::from(u64::MAX)));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_to_json() {
        let value = Value::object([
            ("n", Value::Decimal(rust_decimal::Decimal::new(150, 2))),
            ("nan", Value::Float(f64::NAN)),
            ("list", Value::Array(vec![Value::Boolean(true), Value::Null])),
        ]);
        assert_eq!(value.to_json(), json!({"n": 1.5, "nan": null, "list": [true, null]}));
    }
}

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::methods::MethodDescriptor;

mod host;
mod sequence;

pub use host::HostObject;
pub use sequence::{Deferred, Sequence};

/// A runtime value produced or consumed by expression evaluation.
///
/// Numbers keep the representation they were written or computed in. The
/// left operand of an arithmetic operator decides the representation of the
/// result, so `Integer`, `Long` and `BigInteger` stay distinct rather than
/// collapsing into one numeric kind.
///
/// # Examples
///
/// ```
/// use pathexpr::Value;
/// use std::collections::HashMap;
///
/// let count = Value::Integer(42);
/// let price = Value::Float(3.5);
/// let name = Value::from("widget");
///
/// let mut record = HashMap::new();
/// record.insert("name".to_string(), name);
/// record.insert("count".to_string(), count);
/// let object = Value::Object(record);
///
/// assert!(object.is_map());
/// assert!(price.is_numeric());
/// ```
#[derive(Clone)]
pub enum Value {
    /// The absent value
    Null,

    Boolean(bool),

    /// 32-bit integer, the default for integer literals that fit
    Integer(i32),

    /// 64-bit integer
    Long(i64),

    /// Arbitrary-precision integer (`b` suffix)
    BigInteger(BigInt),

    /// 64-bit floating point, the default for decimal literals
    Float(f64),

    /// Arbitrary-precision decimal (`b` suffix)
    Decimal(Decimal),

    String(String),

    /// A UTC instant
    Date(DateTime<Utc>),

    /// Ordered collection
    Array(Vec<Value>),

    /// String-keyed map
    Object(HashMap<String, Value>),

    /// A re-iterable, lazily produced collection
    Sequence(Sequence),

    /// An element computed on first use
    Deferred(Deferred),

    /// A callable method, usable as the target of a call expression
    Function(Arc<MethodDescriptor>),

    /// A host object reached through its [`HostObject`] implementation
    Host(Arc<dyn HostObject>),
}

/// The runtime type of a [`Value`], used as a coercion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Boolean,
    Integer,
    Long,
    BigInteger,
    Float,
    Decimal,
    String,
    Date,
    Array,
    Object,
    Sequence,
    Deferred,
    Function,
    Host,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::Integer
                | ValueType::Long
                | ValueType::BigInteger
                | ValueType::Float
                | ValueType::Decimal
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Long => "long",
            ValueType::BigInteger => "big integer",
            ValueType::Float => "float",
            ValueType::Decimal => "decimal",
            ValueType::String => "string",
            ValueType::Date => "date",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Sequence => "sequence",
            ValueType::Deferred => "deferred",
            ValueType::Function => "function",
            ValueType::Host => "host object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Long(_) => ValueType::Long,
            Value::BigInteger(_) => ValueType::BigInteger,
            Value::Float(_) => ValueType::Float,
            Value::Decimal(_) => ValueType::Decimal,
            Value::String(_) => ValueType::String,
            Value::Date(_) => ValueType::Date,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
            Value::Sequence(_) => ValueType::Sequence,
            Value::Deferred(_) => ValueType::Deferred,
            Value::Function(_) => ValueType::Function,
            Value::Host(_) => ValueType::Host,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        self.value_type().is_numeric()
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Arrays and lazy sequences: everything that index and filter access treats as a list.
    pub fn is_list_like(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Sequence(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view of any numeric value; fractional parts are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            Value::BigInteger(n) => n.to_i64(),
            Value::Float(n) if n.is_finite() => Some(n.trunc() as i64),
            Value::Decimal(d) => d.trunc().to_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(f64::from(*n)),
            Value::Long(n) => Some(*n as f64),
            Value::BigInteger(n) => n.to_f64(),
            Value::Float(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Resolves a [`Value::Deferred`] element; every other value is returned as is.
    pub fn resolved(self) -> Result<Value, crate::EvaluationError> {
        match self {
            Value::Deferred(deferred) => deferred.resolve(),
            other => Ok(other),
        }
    }

    /// Elements of a list-like value in order, `None` for anything else.
    pub fn elements(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        match self {
            Value::Array(items) => Some(Box::new(items.iter().cloned())),
            Value::Sequence(sequence) => Some(Box::new(sequence.iter())),
            _ => None,
        }
    }

    /// Collects a list-like value into a vector.
    pub fn to_list(&self) -> Option<Vec<Value>> {
        self.elements().map(Iterator::collect)
    }

    /// Text form used for string concatenation, map keys and accessor names.
    pub fn to_text(&self) -> String {
        crate::output::to_text(self)
    }

    /// Builds an object from key/value pairs.
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => a.equals(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Value::Long(n) => f.debug_tuple("Long").field(n).finish(),
            Value::BigInteger(n) => f.debug_tuple("BigInteger").field(n).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::Decimal(d) => f.debug_tuple("Decimal").field(d).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Date(d) => f.debug_tuple("Date").field(d).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Sequence(s) => s.fmt(f),
            Value::Deferred(d) => d.fmt(f),
            Value::Function(m) => f.debug_tuple("Function").field(&m.name()).finish(),
            Value::Host(h) => f.debug_tuple("Host").field(&h.type_chain()).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInteger(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

//! Textual rendering of runtime values.
//!
//! Two forms are produced:
//!
//! - **Text** via [`to_text()`] - the plain form used when a value takes part
//!   in string concatenation, becomes a map key or names an accessor member.
//!   Strings render without quotes.
//! - **Literal** via [`to_literal()`] - the source form used when an
//!   expression tree is rendered back to text. Strings are quoted and escaped,
//!   arbitrary-precision numbers keep their `b` suffix and whole floats keep
//!   their decimal point, so the rendered text parses back to the same literal.
//!
//! # Examples
//!
//! ```
//! use pathexpr::Value;
//! use pathexpr::output::{to_literal, to_text};
//!
//! let value = Value::from("it's");
//! assert_eq!(to_text(&value), "it's");
//! assert_eq!(to_literal(&value), "\"it's\"");
//!
//! assert_eq!(to_literal(&Value::Float(2.0)), "2.0");
//! ```

use crate::value::Value;

pub struct ValuePrinter {
    literal: bool,
}

impl ValuePrinter {
    pub fn new(literal: bool) -> Self {
        ValuePrinter { literal }
    }

    pub fn print(&self, value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Long(n) => n.to_string(),
            Value::BigInteger(n) if self.literal => format!("{}b", n),
            Value::BigInteger(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::Decimal(d) if self.literal => {
                let text = d.normalize().to_string();
                if text.contains('.') {
                    format!("{}b", text)
                } else {
                    format!("{}.0b", text)
                }
            }
            Value::Decimal(d) => d.normalize().to_string(),
            Value::String(s) if self.literal => quote_string(s),
            Value::String(s) => s.clone(),
            Value::Date(d) if self.literal => quote_string(&d.to_rfc3339()),
            Value::Date(d) => d.to_rfc3339(),
            Value::Array(items) => self.print_list(items.iter()),
            Value::Sequence(sequence) => self.print_list(sequence.iter().collect::<Vec<_>>().iter()),
            Value::Object(map) => {
                // Sort keys for deterministic output
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                let items: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}={}", k, self.print(&map[k])))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Value::Deferred(deferred) => match deferred.resolve() {
                Ok(value) => self.print(&value),
                Err(_) => "<deferred>".to_string(),
            },
            Value::Function(method) => format!("{}()", method.name()),
            Value::Host(host) => format!("{:?}", host),
        }
    }

    fn print_list<'a>(&self, items: impl Iterator<Item = &'a Value>) -> String {
        let items: Vec<String> = items.map(|v| self.print(v)).collect();
        format!("[{}]", items.join(", "))
    }
}

/// Whole floats keep one decimal place so they stay floats when re-read.
pub fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

/// Quotes with `"` unless the text contains `"` and no `'`.
pub fn quote_string(s: &str) -> String {
    let quote = if s.contains('"') && !s.contains('\'') {
        '\''
    } else {
        '"'
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Converts a value to its plain text form.
pub fn to_text(value: &Value) -> String {
    ValuePrinter::new(false).print(value)
}

/// Converts a value to source literal form.
///
/// Only literal values (null, booleans, numbers, strings and lists of them)
/// are guaranteed to read back as the same value.
pub fn to_literal(value: &Value) -> String {
    ValuePrinter::new(true).print(value)
}

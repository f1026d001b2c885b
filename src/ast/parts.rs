use std::sync::Arc;

use num_bigint::BigInt;

use super::{Operation, TokenKind};
use crate::{lexer::Position, value::Value};

/// Payload of a [`QueryPart`].
#[derive(Debug, Clone)]
pub enum PartContent {
    /// Value of a literal token
    Literal(Value),
    /// Lexeme of a path segment, method name or operator
    Text(String),
    /// A resolved sub-tree
    Operation(Arc<Operation>),
    /// An empty scope such as `()`
    Empty,
}

/// A typed unit of a parsed expression.
///
/// Produced by the interpreter, rewritten by the analyzer as tokens fold
/// into operations, and finally held by the finished tree (operators keep
/// their lexeme so the tree renders with the spelling that was parsed).
#[derive(Debug, Clone)]
pub struct QueryPart {
    pub kind: TokenKind,
    pub content: PartContent,
    /// Source span; `None` for parts the analyzer created.
    pub position: Option<Position>,
}

impl QueryPart {
    pub fn new(kind: TokenKind, content: PartContent, position: Option<Position>) -> Self {
        QueryPart {
            kind,
            content,
            position,
        }
    }

    pub fn literal(kind: TokenKind, value: Value, position: Position) -> Self {
        QueryPart::new(kind, PartContent::Literal(value), Some(position))
    }

    pub fn text(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        QueryPart::new(kind, PartContent::Text(text.into()), Some(position))
    }

    /// Wraps a resolved operation; `None` marks an empty scope.
    pub fn operation(kind: TokenKind, operation: Option<Arc<Operation>>) -> Self {
        let content = match operation {
            Some(op) => PartContent::Operation(op),
            None => PartContent::Empty,
        };
        QueryPart::new(kind, content, None)
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            PartContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&Arc<Operation>> {
        match &self.content {
            PartContent::Operation(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match &self.content {
            PartContent::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Source-like rendering, used in error messages and tree rendering.
    pub fn render(&self) -> String {
        match &self.content {
            PartContent::Literal(value) => crate::output::to_literal(value),
            PartContent::Text(text) => text.clone(),
            PartContent::Operation(op) => op.to_string(),
            PartContent::Empty => String::new(),
        }
    }
}

impl PartialEq for QueryPart {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.content, &other.content) {
            (PartContent::Literal(a), PartContent::Literal(b)) => literal_eq(a, b),
            (PartContent::Text(a), PartContent::Text(b)) => a == b,
            (PartContent::Operation(a), PartContent::Operation(b)) => a == b,
            (PartContent::Empty, PartContent::Empty) => true,
            _ => false,
        }
    }
}

/// Literal equality: integer kinds compare by integer value, decimal kinds by float value.
pub(crate) fn literal_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (
            Value::Integer(_) | Value::Long(_) | Value::BigInteger(_),
            Value::Integer(_) | Value::Long(_) | Value::BigInteger(_),
        ) => integral(a) == integral(b),
        (Value::Float(_) | Value::Decimal(_), Value::Float(_) | Value::Decimal(_)) => {
            a.as_f64() == b.as_f64()
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| literal_eq(x, y))
        }
        _ => a == b,
    }
}

fn integral(value: &Value) -> Option<BigInt> {
    match value {
        Value::Integer(n) => Some(BigInt::from(*n)),
        Value::Long(n) => Some(BigInt::from(*n)),
        Value::BigInteger(n) => Some(n.clone()),
        _ => None,
    }
}

//! An embeddable path expression language.
//!
//! Expressions such as `order/lines[price > 10]/sku` or
//! `substring(name, 0, 3) == "abc"` are tokenized by a table of regular
//! expressions, folded into an [`Operation`] tree by precedence, and
//! evaluated against any context value through pluggable accessors,
//! converters and methods held by a [`Runtime`].
//!
//! # Examples
//!
//! ```
//! use pathexpr::Value;
//! use serde_json::json;
//!
//! let context = Value::from(json!({"a": 1, "b": [1, 2, 3]}));
//! let member = pathexpr::parse("a in b").unwrap();
//! assert_eq!(member.evaluate(&context).unwrap(), Value::Boolean(true));
//!
//! let filtered = pathexpr::parse("b[$this > 1]").unwrap();
//! assert_eq!(filtered.evaluate(&context).unwrap(), Value::from(json!([2, 3])));
//! ```
use std::sync::Arc;

pub mod accessor;
pub mod analyzer;
pub mod ast;
pub mod config;
pub mod convert;
pub mod evaluator;
pub mod grammar;
pub mod json;
pub mod lexer;
pub mod methods;
pub mod output;
pub mod parser;
pub mod runtime;
pub mod token_list;
pub mod value;

pub use accessor::{AccessorRegistry, ContextAccessor, ContextType};
pub use ast::{Operation, OperationKind, PathSegment, QueryPart, TokenKind};
pub use config::{EvaluatorConfig, ParserOptions};
pub use convert::{ConversionError, Converter, StandardConverter};
pub use evaluator::{EvalContext, EvaluationError, OperatorExecutor};
pub use lexer::{LexError, Lexer, Position};
pub use methods::{MethodDescriptor, MethodGroup, MethodRegistry, NamespaceLoader, Parameter};
pub use parser::{ParseError, QueryParser, default_parser};
pub use runtime::Runtime;
pub use value::{Deferred, HostObject, Sequence, Value, ValueType};

/// Parses `text` with the process-wide parser and its cache.
pub fn parse(text: &str) -> Result<Arc<Operation>, ParseError> {
    default_parser().parse(text)
}

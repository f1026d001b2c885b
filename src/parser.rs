use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

use crate::{
    analyzer::PathAnalyzer,
    ast::{Operation, QueryPart, TokenKind},
    config::ParserOptions,
    lexer::{LexError, Lexer},
};

/// Errors raised while parsing an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("There are {0} unclosed scopes")]
    UnclosedScopes(usize),

    #[error("There are {0} scopes that are closed but were never opened to begin with")]
    UnopenedScopes(usize),

    #[error("There are {0} unclosed indexes")]
    UnclosedIndexes(usize),

    #[error("There are {0} indexes that are closed but were never opened to begin with")]
    UnopenedIndexes(usize),

    #[error("All separators must exist in a scope")]
    UnscopedSeparator,

    #[error("Missing end scope token for method call: {0}")]
    MissingMethodEnd(String),

    #[error("Missing end index token after: {0}")]
    MissingIndexEnd(String),

    #[error("Empty argument in method call: {0}")]
    EmptyArgument(String),

    #[error("Empty index after: {0}")]
    EmptyIndex(String),

    #[error("Empty element in list literal")]
    EmptyElement,

    #[error("Found operator {operator} of precedence {found} while parsing for precedence {expected}")]
    PrecedenceViolation {
        operator: String,
        found: u8,
        expected: u8,
    },

    #[error("The operator {0} expects a left operand but there wasn't one")]
    MissingLeftOperand(String),

    #[error("The operator {0} expects a right operand but there wasn't one")]
    MissingRightOperand(String),

    #[error("A dangling token was detected: {0}")]
    DanglingToken(String),

    #[error("Unexpected operand after '{operation}': {operand}")]
    UnexpectedOperand { operation: String, operand: String },

    #[error("Expecting only operators and native types at this point, found {kind}: {text}")]
    UnresolvedToken { kind: TokenKind, text: String },

    #[error("The query does not contain an expression")]
    EmptyExpression,
}

/// Parses expressions and caches the resulting trees by source text.
///
/// A parser is cheap to share: the cache is a concurrent map and every
/// cached tree is immutable.
///
/// # Examples
///
/// ```
/// use pathexpr::QueryParser;
///
/// let parser = QueryParser::default();
/// let first = parser.parse("a + b").unwrap();
/// let second = parser.parse("a + b").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(first.to_string(), "a + b");
/// ```
#[derive(Default)]
pub struct QueryParser {
    options: ParserOptions,
    cache: DashMap<String, Arc<Operation>>,
}

impl QueryParser {
    pub fn new(options: ParserOptions) -> Self {
        QueryParser {
            options,
            cache: DashMap::new(),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses `text`, returning the cached tree when the same text was parsed before.
    pub fn parse(&self, text: &str) -> Result<Arc<Operation>, ParseError> {
        if let Some(cached) = self.cache.get(text) {
            debug!(expression = text, "parse cache hit");
            return Ok(cached.value().clone());
        }

        let operation = self.parse_uncached(text)?;
        debug!(expression = text, "parse cache miss");
        // a concurrent parse of the same text may have won; keep the first tree
        let entry = self
            .cache
            .entry(text.to_string())
            .or_insert(operation);
        Ok(entry.value().clone())
    }

    /// Parses `text` without consulting or filling the cache.
    pub fn parse_uncached(&self, text: &str) -> Result<Arc<Operation>, ParseError> {
        let parts = Lexer::new(text).lenient(self.options.lenient).lex()?;
        self.validate(&parts)?;
        PathAnalyzer::new(parts).analyze()
    }

    /// Checks that scopes and indexes balance and that separators are enclosed.
    pub fn validate(&self, parts: &[QueryPart]) -> Result<(), ParseError> {
        let (mut scopes, mut unopened_scopes) = (0usize, 0usize);
        let (mut indexes, mut unopened_indexes) = (0usize, 0usize);

        for part in parts {
            match part.kind {
                TokenKind::ScopeStart => scopes += 1,
                TokenKind::ScopeStop if scopes == 0 => unopened_scopes += 1,
                TokenKind::ScopeStop => scopes -= 1,
                TokenKind::IndexStart => indexes += 1,
                TokenKind::IndexStop if indexes == 0 => unopened_indexes += 1,
                TokenKind::IndexStop => indexes -= 1,
                TokenKind::Separator
                    if scopes == 0 && indexes == 0 && !self.options.allow_unscoped_separators =>
                {
                    return Err(ParseError::UnscopedSeparator);
                }
                _ => {}
            }
        }

        if unopened_scopes > 0 {
            Err(ParseError::UnopenedScopes(unopened_scopes))
        } else if scopes > 0 {
            Err(ParseError::UnclosedScopes(scopes))
        } else if unopened_indexes > 0 {
            Err(ParseError::UnopenedIndexes(unopened_indexes))
        } else if indexes > 0 {
            Err(ParseError::UnclosedIndexes(indexes))
        } else {
            Ok(())
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

static DEFAULT_PARSER: Lazy<QueryParser> = Lazy::new(|| QueryParser::new(ParserOptions::from_env()));

/// The process-wide parser behind [`parse`](crate::parse).
pub fn default_parser() -> &'static QueryParser {
    &DEFAULT_PARSER
}

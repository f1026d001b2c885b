use std::str::FromStr;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{QueryPart, TokenKind},
    grammar::grammar,
    value::Value,
};

/// Byte span of a lexeme in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn new(start: usize, end: usize) -> Self {
        Position { start, end }
    }

    /// The span covering both `self` and `other`.
    pub fn merge(self, other: Position) -> Position {
        Position::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A lexeme as found by the tokenizer, before identification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub text: String,
    pub position: Position,
    /// Noise skipped in front of the lexeme (lenient mode only)
    pub preamble: Option<String>,
}

/// Errors raised while turning source text into query parts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Invalid token detected in [{}, {}]: '{text}'", .position.start, .position.end)]
    InvalidToken { text: String, position: Position },

    #[error("The query contains no identifiable tokens")]
    NoTokens,

    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Invalid grammar: {0}")]
    Grammar(#[from] regex::Error),
}

/// Tokenizer and token interpreter for one source text.
///
/// # Examples
///
/// ```
/// use pathexpr::{Lexer, TokenKind};
///
/// let parts = Lexer::new("(-1) + a").lex().unwrap();
/// let kinds: Vec<TokenKind> = parts.iter().map(|p| p.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::ScopeStart,
///         TokenKind::NumberInteger,
///         TokenKind::ScopeStop,
///         TokenKind::Add,
///         TokenKind::Variable,
///     ]
/// );
/// ```
pub struct Lexer<'a> {
    input: &'a str,
    lenient: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            lenient: false,
        }
    }

    /// Skip unmatched noise and keep unidentified lexemes instead of failing.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Tokenizes and interprets the input.
    pub fn lex(&self) -> Result<Vec<QueryPart>, LexError> {
        let tokens = self.tokenize()?;
        self.interpret(&tokens)
    }

    /// Splits the input into raw lexemes.
    pub fn tokenize(&self) -> Result<Vec<RawToken>, LexError> {
        let grammar = grammar()?;
        let mut tokens = Vec::new();
        let mut at = 0;

        while at < self.input.len() {
            let Some(found) = grammar.find_at(self.input, at) else {
                break;
            };
            let preamble = self.check_gap(at, found.start)?;
            tokens.push(RawToken {
                text: self.input[found.start..found.end].to_string(),
                position: Position::new(found.start, found.end),
                preamble,
            });
            at = if found.end > found.start {
                found.end
            } else {
                next_char_boundary(self.input, found.end)
            };
        }
        self.check_gap(at.min(self.input.len()), self.input.len())?;

        if tokens.is_empty() {
            return Err(LexError::NoTokens);
        }
        trace!(count = tokens.len(), "tokenized expression");
        Ok(tokens)
    }

    /// Text between two lexemes must be whitespace unless lenient.
    fn check_gap(&self, start: usize, end: usize) -> Result<Option<String>, LexError> {
        let gap = &self.input[start..end];
        if gap.trim().is_empty() {
            return Ok(None);
        }
        if self.lenient {
            trace!(noise = gap, "skipping unmatched text");
            return Ok(Some(gap.to_string()));
        }
        Err(LexError::InvalidToken {
            text: gap.to_string(),
            position: Position::new(start, end),
        })
    }

    /// Identifies each raw lexeme and converts it into a typed part.
    pub fn interpret(&self, tokens: &[RawToken]) -> Result<Vec<QueryPart>, LexError> {
        let grammar = grammar()?;
        let mut parts: Vec<QueryPart> = Vec::with_capacity(tokens.len());

        for (i, token) in tokens.iter().enumerate() {
            let before_scope = tokens.get(i + 1).is_some_and(|next| next.text == "(");
            let Some(kind) = grammar.identify(&token.text, before_scope) else {
                if self.lenient {
                    parts.push(QueryPart::text(TokenKind::Unknown, &token.text, token.position));
                    continue;
                }
                return Err(LexError::UnknownToken(token.text.clone()));
            };

            let part = match kind {
                TokenKind::String => {
                    QueryPart::literal(kind, Value::String(unescape(&token.text)), token.position)
                }
                TokenKind::NumberInteger | TokenKind::NumberDecimal => {
                    if folds_sign(&parts) {
                        let sign = parts.pop().and_then(|p| p.position);
                        let position = sign.map_or(token.position, |s| s.merge(token.position));
                        QueryPart::literal(kind, parse_number(kind, &token.text, true)?, position)
                    } else {
                        QueryPart::literal(kind, parse_number(kind, &token.text, false)?, token.position)
                    }
                }
                TokenKind::BooleanTrue => QueryPart::literal(kind, Value::Boolean(true), token.position),
                TokenKind::BooleanFalse => {
                    QueryPart::literal(kind, Value::Boolean(false), token.position)
                }
                TokenKind::Null => QueryPart::literal(kind, Value::Null, token.position),
                _ => QueryPart::text(kind, &token.text, token.position),
            };
            parts.push(part);
        }

        trace!(count = parts.len(), "interpreted expression");
        Ok(parts)
    }
}

/// A `-` directly before a number is a sign when nothing that could be a
/// left operand precedes it: `(-1)`, `a, -1`, `2 * -1`, `[-1]`.
fn folds_sign(parts: &[QueryPart]) -> bool {
    let Some(last) = parts.last() else {
        return false;
    };
    if last.kind != TokenKind::Subtract {
        return false;
    }
    match parts.len() {
        1 => true,
        n => {
            let before = parts[n - 2].kind;
            before.is_operator()
                || matches!(
                    before,
                    TokenKind::ScopeStart | TokenKind::Separator | TokenKind::IndexStart
                )
        }
    }
}

/// Parses a number lexeme, with the sign folded in before narrowing so that
/// `-2147483648` is still an `Integer`.
fn parse_number(kind: TokenKind, text: &str, negative: bool) -> Result<Value, LexError> {
    let (digits, big) = match text.strip_suffix(['b', 'B']) {
        Some(digits) => (digits, true),
        None => (text, false),
    };
    let signed = if negative { format!("-{}", digits) } else { digits.to_string() };
    let invalid = || LexError::InvalidNumber(if negative { format!("-{}", text) } else { text.to_string() });

    if kind == TokenKind::NumberDecimal {
        return if big {
            Decimal::from_str(&signed).map(Value::Decimal).map_err(|_| invalid())
        } else {
            signed.parse::<f64>().map(Value::Float).map_err(|_| invalid())
        };
    }

    if big {
        return signed.parse::<BigInt>().map(Value::BigInteger).map_err(|_| invalid());
    }
    if let Ok(n) = signed.parse::<i32>() {
        Ok(Value::Integer(n))
    } else if let Ok(n) = signed.parse::<i64>() {
        Ok(Value::Long(n))
    } else {
        signed.parse::<BigInt>().map(Value::BigInteger).map_err(|_| invalid())
    }
}

/// Strips the quotes and decodes `\\`, `\t`, `\n`, `\r` and escaped quotes.
fn unescape(lexeme: &str) -> String {
    let inner = lexeme
        .get(1..lexeme.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(q @ ('\\' | '"' | '\'')) => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn next_char_boundary(text: &str, at: usize) -> usize {
    text[at..]
        .chars()
        .next()
        .map_or(text.len(), |c| at + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#""a\"b\\c\nd""#), "a\"b\\c\nd");
        assert_eq!(unescape(r"'it\'s'"), "it's");
    }

    #[test]
    fn test_narrowest_integer() {
        let number = |text| parse_number(TokenKind::NumberInteger, text, false).unwrap();
        assert_eq!(number("42"), Value::Integer(42));
        assert_eq!(number("4000000000"), Value::Long(4_000_000_000));
        assert_eq!(number("42b"), Value::BigInteger(BigInt::from(42)));
        assert_eq!(
            number("170141183460469231731687303715884105728"),
            Value::BigInteger("170141183460469231731687303715884105728".parse().unwrap())
        );
    }

    #[test]
    fn test_sign_narrows_with_the_literal() {
        let negative = |text| parse_number(TokenKind::NumberInteger, text, true).unwrap();
        assert_eq!(negative("2147483648"), Value::Integer(i32::MIN));
        assert_eq!(negative("9223372036854775808"), Value::Long(i64::MIN));
        assert_eq!(negative("9223372036854775809"), Value::BigInteger(BigInt::from(i64::MIN) - 1));
        assert_eq!(
            parse_number(TokenKind::NumberDecimal, "1.5b", true).unwrap(),
            Value::Decimal(Decimal::new(-15, 1))
        );
    }

    #[test]
    fn test_sign_folding() {
        let parts = Lexer::new("3-1").lex().unwrap();
        assert_eq!(parts.len(), 3);

        let parts = Lexer::new("a, -1").lex().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].as_literal(), Some(&Value::Integer(-1)));
        assert_eq!(parts[2].position, Some(Position::new(3, 5)));
    }
}

//! The ordered grammar table.
//!
//! Each entry pairs a token kind with the pattern that finds it in source
//! text. Entries are tried in order at every position, so longer spellings
//! precede their prefixes (`>=` before `>`, `**` before `*`) and reserved
//! words precede the method and path patterns that would otherwise swallow
//! them.
//!
//! An entry may carry a trailing-context pattern: text that has to follow
//! the lexeme for the entry to match but is not part of the lexeme. Method
//! names use it to require an opening parenthesis.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::TokenKind;

pub struct GrammarEntry {
    pub kind: TokenKind,
    pub pattern: &'static str,
    pub trailing: Option<&'static str>,
}

const fn entry(kind: TokenKind, pattern: &'static str) -> GrammarEntry {
    GrammarEntry {
        kind,
        pattern,
        trailing: None,
    }
}

pub static ENTRIES: &[GrammarEntry] = &[
    entry(
        TokenKind::String,
        r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#,
    ),
    entry(TokenKind::NumberDecimal, r"\b[0-9]+\.[0-9]+b?\b"),
    entry(TokenKind::NumberInteger, r"\b[0-9]+b?\b"),
    entry(TokenKind::BooleanTrue, r"\btrue\b"),
    entry(TokenKind::BooleanFalse, r"\bfalse\b"),
    entry(TokenKind::Null, r"\bnull\b"),
    // reserved words
    entry(TokenKind::LogicalAnd, r"\band\b"),
    entry(TokenKind::LogicalOr, r"\bor\b"),
    entry(TokenKind::NotIn, r"\bnot\s+in\b"),
    entry(TokenKind::In, r"\bin\b"),
    GrammarEntry {
        kind: TokenKind::Method,
        pattern: r"(?:\$+|\b[a-zA-Z]+)[\w.]*",
        trailing: Some(r"\s*\("),
    },
    entry(
        TokenKind::Variable,
        r"(?:/?@?(?:(?:\b[a-zA-Z_]+|\$)[\w.]*|\.\.))+\b",
    ),
    entry(TokenKind::Separator, r","),
    entry(TokenKind::ScopeStart, r"\("),
    entry(TokenKind::ScopeStop, r"\)"),
    entry(TokenKind::IndexStart, r"\["),
    entry(TokenKind::IndexStop, r"\]"),
    entry(TokenKind::Naming, r":"),
    entry(TokenKind::LogicalAnd, r"&&"),
    entry(TokenKind::LogicalOr, r"\|\|"),
    entry(TokenKind::BitwiseOr, r"\|"),
    entry(TokenKind::BitwiseAnd, r"&"),
    entry(TokenKind::Power, r"\*\*"),
    entry(TokenKind::Multiply, r"\*"),
    entry(TokenKind::Increase, r"\+\+"),
    entry(TokenKind::Decrease, r"--"),
    entry(TokenKind::Add, r"\+"),
    entry(TokenKind::Subtract, r"-"),
    entry(TokenKind::Divide, r"/|÷"),
    entry(TokenKind::NotIn, r"!#"),
    entry(TokenKind::In, r"#"),
    entry(TokenKind::GreaterOrEquals, r">="),
    entry(TokenKind::Greater, r">"),
    entry(TokenKind::LesserOrEquals, r"<="),
    entry(TokenKind::Lesser, r"<"),
    entry(TokenKind::NotMatches, r"!~"),
    entry(TokenKind::Matches, r"~"),
    entry(TokenKind::Mod, r"%"),
    entry(TokenKind::NotXor, r"!\^"),
    entry(TokenKind::Xor, r"\^"),
    entry(TokenKind::NotEquals, r"!="),
    entry(TokenKind::Equals, r"==|="),
    entry(TokenKind::Not, r"!"),
    entry(TokenKind::Compose, r"°"),
];

const FLAGS: &str = "(?si)";

/// The compiled grammar: one scanning pattern over every entry plus one
/// anchored identifying pattern per entry.
pub struct Grammar {
    kinds: Vec<TokenKind>,
    scanner: Regex,
    /// Capture group index of each entry inside `scanner`
    groups: Vec<usize>,
    identifiers: Vec<Regex>,
}

/// A lexeme located by [`Grammar::find_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Grammar {
    pub fn compile(entries: &[GrammarEntry]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| format!("(?:(?P<g{}>{}){})", i, e.pattern, e.trailing.unwrap_or("")))
            .collect();
        let scanner = Regex::new(&format!("{}{}", FLAGS, alternatives.join("|")))?;

        let names: Vec<Option<&str>> = scanner.capture_names().collect();
        let groups = (0..entries.len())
            .map(|i| {
                let name = format!("g{}", i);
                names
                    .iter()
                    .position(|n| *n == Some(name.as_str()))
                    .unwrap_or(0)
            })
            .collect();

        let identifiers = entries
            .iter()
            .map(|e| Regex::new(&format!("{}^(?:{})$", FLAGS, e.pattern)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Grammar {
            kinds: entries.iter().map(|e| e.kind).collect(),
            scanner,
            groups,
            identifiers,
        })
    }

    /// Finds the leftmost lexeme starting at or after `at`.
    pub fn find_at(&self, text: &str, at: usize) -> Option<Match> {
        let captures = self.scanner.captures_at(text, at)?;
        self.groups.iter().enumerate().find_map(|(i, group)| {
            captures.get(*group).map(|m| Match {
                kind: self.kinds[i],
                start: m.start(),
                end: m.end(),
            })
        })
    }

    /// Identifies a lexeme by full match against each entry in table order.
    ///
    /// A method name is only a method when an opening parenthesis follows.
    pub fn identify(&self, lexeme: &str, before_scope: bool) -> Option<TokenKind> {
        self.kinds
            .iter()
            .zip(&self.identifiers)
            .find(|(kind, identifier)| {
                identifier.is_match(lexeme) && (**kind != TokenKind::Method || before_scope)
            })
            .map(|(kind, _)| *kind)
    }
}

static GRAMMAR: Lazy<Result<Grammar, regex::Error>> = Lazy::new(|| Grammar::compile(ENTRIES));

/// The process-wide compiled grammar.
pub fn grammar() -> Result<&'static Grammar, regex::Error> {
    GRAMMAR.as_ref().map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        let grammar = grammar().unwrap();
        let mut at = 0;
        let mut out = Vec::new();
        while let Some(m) = grammar.find_at(text, at) {
            out.push(m.kind);
            at = m.end;
        }
        out
    }

    #[test]
    fn test_longest_operator_first() {
        assert_eq!(
            kinds("a >= 1 ** 2"),
            vec![
                TokenKind::Variable,
                TokenKind::GreaterOrEquals,
                TokenKind::NumberInteger,
                TokenKind::Power,
                TokenKind::NumberInteger,
            ]
        );
    }

    #[test]
    fn test_method_needs_parenthesis() {
        assert_eq!(
            kinds("now () now"),
            vec![
                TokenKind::Method,
                TokenKind::ScopeStart,
                TokenKind::ScopeStop,
                TokenKind::Variable,
            ]
        );
    }

    #[test]
    fn test_reserved_words() {
        assert_eq!(
            kinds("a not in b and c"),
            vec![
                TokenKind::Variable,
                TokenKind::NotIn,
                TokenKind::Variable,
                TokenKind::LogicalAnd,
                TokenKind::Variable,
            ]
        );
        // words only match on their own
        assert_eq!(kinds("order"), vec![TokenKind::Variable]);
    }

    #[test]
    fn test_paths() {
        assert_eq!(kinds("../a/b"), vec![TokenKind::Variable]);
        assert_eq!(kinds("/root"), vec![TokenKind::Variable]);
        assert_eq!(kinds("1 / 2"), vec![
            TokenKind::NumberInteger,
            TokenKind::Divide,
            TokenKind::NumberInteger,
        ]);
    }
}

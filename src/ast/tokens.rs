use std::fmt;

/// Category of a lexeme once the interpreter has identified it.
///
/// Literal kinds carry their value in the [`QueryPart`](super::QueryPart)
/// content. Structural kinds only exist while the analyzer works on the
/// token list. Operator kinds survive into the tree as the operator of a
/// [`ClassicOperation`](super::ClassicOperation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A lexeme no grammar entry identifies (lenient parsing only)
    Unknown,

    // Literals
    /// Quoted string, `"text"` or `'text'`
    String,
    /// Integer literal, `42` or `42b`
    NumberInteger,
    /// Decimal literal, `3.14` or `3.14b`
    NumberDecimal,
    BooleanTrue,
    BooleanFalse,
    Null,

    // Structure
    /// Path segment, e.g. `a/b`, `../x`, `@attr`, `$this`
    Variable,
    /// Method name directly followed by `(`
    Method,
    ScopeStart,
    ScopeStop,
    IndexStart,
    IndexStop,
    Separator,
    /// A resolved sub-tree spliced back into the token list
    Operation,

    // Operators
    /// `:`
    Naming,
    /// `or`, `||`
    LogicalOr,
    /// `and`, `&&`
    LogicalAnd,
    /// `|`
    BitwiseOr,
    /// `^`
    Xor,
    /// `!^`
    NotXor,
    /// `&`
    BitwiseAnd,
    /// `==`, `=`
    Equals,
    /// `!=`
    NotEquals,
    /// `~`
    Matches,
    /// `!~`
    NotMatches,
    /// `in`, `#`
    In,
    /// `not in`, `!#`
    NotIn,
    /// `>=`
    GreaterOrEquals,
    /// `>`
    Greater,
    /// `<=`
    LesserOrEquals,
    /// `<`
    Lesser,
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `/`, `÷`
    Divide,
    /// `*`
    Multiply,
    /// `%`
    Mod,
    /// `**`
    Power,
    /// `++`
    Increase,
    /// `--`
    Decrease,
    /// `!`
    Not,
    /// `°`
    Compose,
}

impl TokenKind {
    pub fn is_operator(self) -> bool {
        self.precedence().is_some()
    }

    /// Literal kinds, which need no further resolution.
    pub fn is_native(self) -> bool {
        matches!(
            self,
            TokenKind::String
                | TokenKind::NumberInteger
                | TokenKind::NumberDecimal
                | TokenKind::BooleanTrue
                | TokenKind::BooleanFalse
                | TokenKind::Null
        )
    }

    /// Operators whose index use means numeric position rather than a filter.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            TokenKind::Add
                | TokenKind::Subtract
                | TokenKind::Multiply
                | TokenKind::Divide
                | TokenKind::Power
                | TokenKind::Mod
        )
    }

    /// Tokens that close the range a nested analysis works on.
    pub fn is_range_end(self) -> bool {
        matches!(
            self,
            TokenKind::ScopeStop | TokenKind::Separator | TokenKind::IndexStop
        )
    }

    /// Tokens that open the range a nested analysis works on.
    pub fn is_range_start(self) -> bool {
        matches!(
            self,
            TokenKind::ScopeStart | TokenKind::Separator | TokenKind::IndexStart
        )
    }

    /// Resolution tier of an operator; `None` for every other kind.
    ///
    /// Higher tiers bind tighter and are folded first.
    pub fn precedence(self) -> Option<u8> {
        use TokenKind::*;
        let tier = match self {
            Naming | LogicalOr => 0,
            LogicalAnd => 1,
            BitwiseOr => 2,
            Xor | NotXor => 3,
            BitwiseAnd => 4,
            Equals | NotEquals | Matches | NotMatches | In | NotIn | GreaterOrEquals | Greater
            | LesserOrEquals | Lesser => 5,
            Add | Subtract => 6,
            Divide | Multiply | Mod => 7,
            Power => 8,
            Increase | Decrease | Not => 9,
            Compose => 10,
            _ => return None,
        };
        Some(tier)
    }

    pub fn has_left_operand(self) -> bool {
        self.is_operator() && self != TokenKind::Not
    }

    pub fn has_right_operand(self) -> bool {
        self.is_operator() && !matches!(self, TokenKind::Increase | TokenKind::Decrease)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Unknown => "UNKNOWN",
            TokenKind::String => "STRING",
            TokenKind::NumberInteger => "NUMBER_INTEGER",
            TokenKind::NumberDecimal => "NUMBER_DECIMAL",
            TokenKind::BooleanTrue => "BOOLEAN_TRUE",
            TokenKind::BooleanFalse => "BOOLEAN_FALSE",
            TokenKind::Null => "NULL",
            TokenKind::Variable => "VARIABLE",
            TokenKind::Method => "METHOD",
            TokenKind::ScopeStart => "SCOPE_START",
            TokenKind::ScopeStop => "SCOPE_STOP",
            TokenKind::IndexStart => "INDEX_START",
            TokenKind::IndexStop => "INDEX_STOP",
            TokenKind::Separator => "SEPARATOR",
            TokenKind::Operation => "OPERATION",
            TokenKind::Naming => "NAMING",
            TokenKind::LogicalOr => "LOGICAL_OR",
            TokenKind::LogicalAnd => "LOGICAL_AND",
            TokenKind::BitwiseOr => "BITWISE_OR",
            TokenKind::Xor => "XOR",
            TokenKind::NotXor => "NOT_XOR",
            TokenKind::BitwiseAnd => "BITWISE_AND",
            TokenKind::Equals => "EQUALS",
            TokenKind::NotEquals => "NOT_EQUALS",
            TokenKind::Matches => "MATCHES",
            TokenKind::NotMatches => "NOT_MATCHES",
            TokenKind::In => "IN",
            TokenKind::NotIn => "NOT_IN",
            TokenKind::GreaterOrEquals => "GREATER_OR_EQUALS",
            TokenKind::Greater => "GREATER",
            TokenKind::LesserOrEquals => "LESSER_OR_EQUALS",
            TokenKind::Lesser => "LESSER",
            TokenKind::Add => "ADD",
            TokenKind::Subtract => "SUBTRACT",
            TokenKind::Divide => "DIVIDE",
            TokenKind::Multiply => "MULTIPLY",
            TokenKind::Mod => "MOD",
            TokenKind::Power => "POWER",
            TokenKind::Increase => "INCREASE",
            TokenKind::Decrease => "DECREASE",
            TokenKind::Not => "NOT",
            TokenKind::Compose => "COMPOSE",
        };
        f.write_str(name)
    }
}

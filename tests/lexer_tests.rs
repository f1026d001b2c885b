// tests/lexer_tests.rs

use num_bigint::BigInt;
use pathexpr::{LexError, Lexer, Position, TokenKind, Value};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input)
        .lex()
        .unwrap()
        .iter()
        .map(|part| part.kind)
        .collect()
}

fn literal(input: &str) -> Value {
    let parts = Lexer::new(input).lex().unwrap();
    assert_eq!(parts.len(), 1, "expected a single literal in {:?}", input);
    parts[0].as_literal().cloned().unwrap()
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_longest_operator_wins() {
    let test_cases = vec![
        ("a >= b", TokenKind::GreaterOrEquals),
        ("a > b", TokenKind::Greater),
        ("a <= b", TokenKind::LesserOrEquals),
        ("a < b", TokenKind::Lesser),
        ("a == b", TokenKind::Equals),
        ("a = b", TokenKind::Equals),
        ("a != b", TokenKind::NotEquals),
        ("a ** b", TokenKind::Power),
        ("a * b", TokenKind::Multiply),
        ("a && b", TokenKind::LogicalAnd),
        ("a & b", TokenKind::BitwiseAnd),
        ("a || b", TokenKind::LogicalOr),
        ("a | b", TokenKind::BitwiseOr),
        ("a !^ b", TokenKind::NotXor),
        ("a ^ b", TokenKind::Xor),
        ("a !~ b", TokenKind::NotMatches),
        ("a ~ b", TokenKind::Matches),
        ("a !# b", TokenKind::NotIn),
        ("a # b", TokenKind::In),
        ("a % b", TokenKind::Mod),
        ("a ÷ b", TokenKind::Divide),
        ("a / b", TokenKind::Divide),
    ];

    for (input, expected) in test_cases {
        assert_eq!(
            kinds(input),
            vec![TokenKind::Variable, expected, TokenKind::Variable],
            "input: {}",
            input
        );
    }
}

#[test]
fn test_worded_operators() {
    assert_eq!(
        kinds("a and b or c"),
        vec![
            TokenKind::Variable,
            TokenKind::LogicalAnd,
            TokenKind::Variable,
            TokenKind::LogicalOr,
            TokenKind::Variable,
        ]
    );
    assert_eq!(
        kinds("x not in y"),
        vec![TokenKind::Variable, TokenKind::NotIn, TokenKind::Variable]
    );
    assert_eq!(
        kinds("x in y"),
        vec![TokenKind::Variable, TokenKind::In, TokenKind::Variable]
    );
}

#[test]
fn test_unary_operators() {
    assert_eq!(
        kinds("count++ + !done"),
        vec![
            TokenKind::Variable,
            TokenKind::Increase,
            TokenKind::Add,
            TokenKind::Not,
            TokenKind::Variable,
        ]
    );
}

// ============================================================================
// Paths and methods
// ============================================================================

#[test]
fn test_path_is_one_token() {
    let parts = Lexer::new("../order/@id/$0").lex().unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].kind, TokenKind::Variable);
    assert_eq!(parts[0].as_text(), Some("../order/@id/$0"));
}

#[test]
fn test_method_needs_open_scope() {
    assert_eq!(
        kinds("substring(name, 1)"),
        vec![
            TokenKind::Method,
            TokenKind::ScopeStart,
            TokenKind::Variable,
            TokenKind::Separator,
            TokenKind::NumberInteger,
            TokenKind::ScopeStop,
        ]
    );
    assert_eq!(
        kinds("date.now ()"),
        vec![TokenKind::Method, TokenKind::ScopeStart, TokenKind::ScopeStop]
    );
    assert_eq!(kinds("date.now"), vec![TokenKind::Variable]);
}

#[test]
fn test_index_tokens() {
    assert_eq!(
        kinds("items[0]/name"),
        vec![
            TokenKind::Variable,
            TokenKind::IndexStart,
            TokenKind::NumberInteger,
            TokenKind::IndexStop,
            TokenKind::Variable,
        ]
    );
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_number_literals() {
    assert_eq!(literal("42"), Value::Integer(42));
    assert_eq!(literal("3000000000"), Value::Long(3_000_000_000));
    assert_eq!(literal("12b"), Value::BigInteger(BigInt::from(12)));
    assert_eq!(literal("1.5"), Value::Float(1.5));
    assert_eq!(literal("1.25b"), Value::Decimal(Decimal::new(125, 2)));

    let huge = "99999999999999999999999999999999999999999";
    assert_eq!(literal(huge), Value::BigInteger(huge.parse().unwrap()));
    assert_eq!(literal(&format!("{}b", huge)), Value::BigInteger(huge.parse().unwrap()));
}

#[test]
fn test_negative_literals_narrow_after_the_sign() {
    assert_eq!(literal("-2147483648"), Value::Integer(i32::MIN));
    assert_eq!(literal("-2147483649"), Value::Long(-2_147_483_649));
    assert_eq!(literal("-9223372036854775808"), Value::Long(i64::MIN));
    assert_eq!(literal("-1.5b"), Value::Decimal(Decimal::new(-15, 1)));
}

#[test]
fn test_string_literals() {
    assert_eq!(literal(r#""double""#), Value::from("double"));
    assert_eq!(literal("'single'"), Value::from("single"));
    assert_eq!(literal(r"'a\tb'"), Value::from("a\tb"));
    assert_eq!(literal(r#""say \"hi\"""#), Value::from("say \"hi\""));
}

#[test]
fn test_keyword_literals() {
    assert_eq!(literal("true"), Value::Boolean(true));
    assert_eq!(literal("false"), Value::Boolean(false));
    assert_eq!(literal("null"), Value::Null);
}

#[test]
fn test_negative_literals() {
    let parts = Lexer::new("(-1)").lex().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1].as_literal(), Some(&Value::Integer(-1)));

    let parts = Lexer::new("2 * -1.5").lex().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2].as_literal(), Some(&Value::Float(-1.5)));

    // subtraction, not a sign
    assert_eq!(
        kinds("3-1"),
        vec![
            TokenKind::NumberInteger,
            TokenKind::Subtract,
            TokenKind::NumberInteger,
        ]
    );
}

#[test]
fn test_positions() {
    let parts = Lexer::new("a + 10").lex().unwrap();
    assert_eq!(parts[0].position, Some(Position::new(0, 1)));
    assert_eq!(parts[2].position, Some(Position::new(4, 6)));
}

// ============================================================================
// Errors and leniency
// ============================================================================

#[test]
fn test_strict_rejects_noise() {
    let result = Lexer::new("a ¤ b").lex();
    assert!(matches!(result, Err(LexError::InvalidToken { .. })));
}

#[test]
fn test_lenient_skips_noise() {
    let parts = Lexer::new("a ¤ b").lenient(true).lex().unwrap();
    assert_eq!(parts.len(), 2);

    let tokens = Lexer::new("a ¤ b").lenient(true).tokenize().unwrap();
    assert_eq!(tokens[1].preamble.as_deref(), Some(" ¤ "));
}

#[test]
fn test_no_tokens() {
    assert_eq!(Lexer::new("   ").lex(), Err(LexError::NoTokens));
}

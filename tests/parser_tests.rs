// tests/parser_tests.rs

use std::sync::Arc;

use pathexpr::{
    Operation, OperationKind, ParseError, ParserOptions, PathSegment, QueryParser, TokenKind, Value,
};
use pretty_assertions::assert_eq;

fn render(expression: &str) -> String {
    pathexpr::parse(expression).unwrap().to_string()
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_precedence_rendering() {
    let test_cases = vec![
        ("1*2+3*4", "(1 * 2) + (3 * 4)"),
        ("1*2/3*4", "1 * 2 / 3 * 4"),
        ("0+1+-2+3*-1", "0 + 1 + -2 + (3 * -1)"),
        ("5-  (2 + 3)", "5 - (2 + 3)"),
        ("5+(5*(2-(0.5*4)))", "5 + (5 * (2 - (0.5 * 4)))"),
        ("test1++ + test2--", "(test1 ++) + (test2 --)"),
        ("'test' == null", "\"test\" == null"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(render(input), expected, "input: {}", input);
    }
}

#[test]
fn test_path_rendering() {
    assert_eq!(render("tests[someOtherValue='my2']"), "tests[someOtherValue = \"my2\"]");
    assert_eq!(
        render("testsAsArray[someOtherValue='my2'][0]/someValue"),
        "testsAsArray[someOtherValue = \"my2\"][0]/someValue"
    );
    // two adjacent paths read as one
    assert_eq!(render("a b"), "a/b");
}

#[test]
fn test_method_rendering() {
    assert_eq!(render("now() - 1"), "now() - 1");
    assert_eq!(render("$(test)"), "$(test)");
    assert_eq!(render("$test()"), "$test()");
    assert_eq!(render("something()/myField"), "something()/myField");
    assert_eq!(render("something() /myField"), "something()/myField");
    assert_eq!(render("something()/ myField"), "something() / myField");
}

#[test]
fn test_round_trip() {
    let expressions = vec![
        "a+b-c+d",
        "1*2+3*4",
        "x > 1 and (y < 2 or z == 3)",
        "items[k == 'x']/name",
        "substring(name, 1, 2) + '!'",
        "!done && count ++ > 3",
        "[1, 2, a]",
        "a in [1, 2] ^ b !# 'text'",
    ];

    for expression in expressions {
        let parsed = pathexpr::parse(expression).unwrap();
        let reparsed = pathexpr::parse(&parsed.to_string()).unwrap();
        assert_eq!(parsed, reparsed, "expression: {}", expression);
    }
}

// ============================================================================
// Tree shape
// ============================================================================

#[test]
fn test_same_tier_folds_left_to_right() {
    let operation = pathexpr::parse("a+b-c+d").unwrap();
    let Operation::Classic(outer) = operation.as_ref() else {
        panic!("expected a classic operation, got {:?}", operation);
    };
    assert_eq!(outer.operator(), TokenKind::Add);
    let left = outer.left().and_then(|part| part.as_operation()).unwrap();
    assert_eq!(left.as_classic().map(|c| c.operator()), Some(TokenKind::Subtract));
}

#[test]
fn test_variable_segments() {
    let operation = pathexpr::parse("../order/lines[0]/price").unwrap();
    let Operation::Variable(variable) = operation.as_ref() else {
        panic!("expected a variable, got {:?}", operation);
    };
    let segments = variable.segments();
    assert_eq!(segments.len(), 5);
    assert_eq!(segments[0], PathSegment::Name("..".to_string()));
    assert_eq!(segments[2], PathSegment::Name("lines".to_string()));
    assert!(matches!(&segments[3], PathSegment::Operation(op) if op.kind() == OperationKind::Native));
    // a path continuing after an index keeps its separator
    assert_eq!(segments[4], PathSegment::Name("/price".to_string()));
}

#[test]
fn test_method_result_receives_path() {
    let operation = pathexpr::parse("something()/myField").unwrap();
    let Operation::Variable(variable) = operation.as_ref() else {
        panic!("expected a variable, got {:?}", operation);
    };
    assert!(matches!(&variable.segments()[0], PathSegment::Operation(op) if op.kind() == OperationKind::Method));
}

#[test]
fn test_list_literals() {
    let operation = pathexpr::parse("[1, 'two', null]").unwrap();
    let Operation::Native(native) = operation.as_ref() else {
        panic!("expected a literal list, got {:?}", operation);
    };
    assert_eq!(
        native.value(),
        &Value::Array(vec![Value::Integer(1), Value::from("two"), Value::Null])
    );

    let operation = pathexpr::parse("[1, a]").unwrap();
    assert_eq!(operation.kind(), OperationKind::Method);
    assert_eq!(operation.to_string(), "list(1, a)");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_malformed_input() {
    assert!(pathexpr::parse("1++2").is_err());
    assert!(pathexpr::parse("else echo('test')").is_err());
    assert!(pathexpr::parse("a +").is_err());
    assert!(pathexpr::parse("* b").is_err());
}

#[test]
fn test_unbalanced_delimiters() {
    assert_eq!(pathexpr::parse("(1 + 2))").unwrap_err(), ParseError::UnopenedScopes(1));
    assert_eq!(pathexpr::parse("((1 + 2)").unwrap_err(), ParseError::UnclosedScopes(1));
    assert_eq!(pathexpr::parse("a[1").unwrap_err(), ParseError::UnclosedIndexes(1));
    assert_eq!(pathexpr::parse("a]").unwrap_err(), ParseError::UnopenedIndexes(1));
}

#[test]
fn test_unscoped_separator() {
    assert_eq!(pathexpr::parse("a, b").unwrap_err(), ParseError::UnscopedSeparator);

    let parser = QueryParser::new(ParserOptions {
        allow_unscoped_separators: true,
        ..ParserOptions::default()
    });
    let operation = parser.parse("1, 2").unwrap();
    assert_eq!(
        operation.as_ref(),
        &Operation::Native(pathexpr::ast::NativeOperation::new(Value::Array(vec![
            Value::Integer(1),
            Value::Integer(2),
        ])))
    );
}

#[test]
fn test_lenient_parser_skips_noise() {
    let parser = QueryParser::new(ParserOptions {
        lenient: true,
        ..ParserOptions::default()
    });
    assert_eq!(parser.parse("a ¤ + 1").unwrap().to_string(), "a + 1");
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_parse_cache() {
    let parser = QueryParser::default();
    let first = parser.parse("a + b").unwrap();
    let second = parser.parse("a + b").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(parser.cached_len(), 1);

    let uncached = parser.parse_uncached("a + b").unwrap();
    assert!(!Arc::ptr_eq(&first, &uncached));
    assert_eq!(first, uncached);

    parser.clear_cache();
    assert_eq!(parser.cached_len(), 0);
}

#[test]
fn test_failed_parse_is_not_cached() {
    let parser = QueryParser::default();
    assert!(parser.parse("(a").is_err());
    assert_eq!(parser.cached_len(), 0);
}

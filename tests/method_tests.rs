// tests/method_tests.rs

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::object;
use pathexpr::{
    EvaluationError, EvaluatorConfig, MethodDescriptor, MethodGroup, MethodRegistry, NamespaceLoader,
    Parameter, Runtime, Value, ValueType,
};
use pretty_assertions::assert_eq;

fn run(runtime: &Runtime, expression: &str, context: &Value) -> Result<Value, EvaluationError> {
    common::init_test_logging();
    let operation = pathexpr::parse(expression).unwrap();
    runtime.evaluate(&operation, context)
}

fn join() -> MethodDescriptor {
    MethodDescriptor::new(
        "join",
        vec![Parameter::of(ValueType::String), Parameter::Variadic(Some(ValueType::String))],
        |args| {
            let separator = args[0].to_text();
            let parts: Vec<String> = args[1]
                .to_list()
                .unwrap_or_default()
                .iter()
                .map(Value::to_text)
                .collect();
            Ok(Value::from(parts.join(&separator)))
        },
    )
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_variadic_arguments() {
    let runtime = Runtime::default();
    runtime.methods().register(MethodGroup::new().with(join()));

    assert_eq!(run(&runtime, "join('-', 1, 2, 3)", &Value::Null).unwrap(), Value::from("1-2-3"));
    assert_eq!(run(&runtime, "join('-')", &Value::Null).unwrap(), Value::from(""));
}

#[test]
fn test_exact_arity_preferred() {
    let runtime = Runtime::default();
    runtime.methods().register(
        MethodGroup::new()
            .with(MethodDescriptor::new("pick", vec![Parameter::Variadic(None)], |_| {
                Ok(Value::from("variadic"))
            }))
            .with(MethodDescriptor::new("pick", vec![Parameter::any()], |_| Ok(Value::from("exact")))),
    );

    assert_eq!(run(&runtime, "pick(1)", &Value::Null).unwrap(), Value::from("exact"));
    assert_eq!(run(&runtime, "pick(1, 2)", &Value::Null).unwrap(), Value::from("variadic"));
}

#[test]
fn test_null_completion() {
    let pair = || {
        MethodGroup::new().with(MethodDescriptor::new(
            "pair",
            vec![Parameter::any(), Parameter::any()],
            |args| Ok(Value::Array(args.to_vec())),
        ))
    };

    let runtime = Runtime::default();
    runtime.methods().register(pair());
    assert_eq!(
        run(&runtime, "pair(1)", &Value::Null).unwrap(),
        Value::Array(vec![Value::Integer(1), Value::Null])
    );

    let strict = Runtime::new(EvaluatorConfig {
        null_completion: false,
        ..EvaluatorConfig::default()
    });
    strict.methods().register(pair());
    let error = run(&strict, "pair(1)", &Value::Null).unwrap_err();
    assert!(matches!(error.root_cause(), EvaluationError::UnresolvedMethod { .. }));
}

#[test]
fn test_arguments_are_coerced() {
    let runtime = Runtime::default();
    assert_eq!(run(&runtime, "substring(12345, '1', 2)", &Value::Null).unwrap(), Value::from("23"));

    let error = run(&runtime, "substring('abc', 'x')", &Value::Null).unwrap_err();
    assert!(matches!(error.root_cause(), EvaluationError::Conversion(_)));
}

#[test]
fn test_case_insensitive_names() {
    let runtime = Runtime::new(EvaluatorConfig {
        case_sensitive_methods: false,
        ..EvaluatorConfig::default()
    });
    assert_eq!(run(&runtime, "SUBSTRING('abc', 1)", &Value::Null).unwrap(), Value::from("bc"));
    assert!(run(&Runtime::default(), "SUBSTRING('abc', 1)", &Value::Null).is_err());
}

#[test]
fn test_resolution_cache() {
    let registry = MethodRegistry::default();
    let config = EvaluatorConfig::default();
    let first = registry.resolve("substring", 2, &config).unwrap();
    let second = registry.resolve("substring", 2, &config).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.cached_len(), 1);

    registry.register(MethodGroup::new().with(join()));
    assert_eq!(registry.cached_len(), 0);
}

#[test]
fn test_registration_racing_resolution_is_not_lost() {
    let registry = MethodRegistry::empty();
    registry.register(MethodGroup::new().with(MethodDescriptor::new(
        "pick",
        vec![Parameter::Variadic(None)],
        |_| Ok(Value::from("variadic")),
    )));
    let config = EvaluatorConfig::default();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..1_000 {
                registry.resolve("pick", 1, &config).unwrap();
            }
        });
        scope.spawn(|| {
            registry.register(MethodGroup::new().with(MethodDescriptor::new(
                "pick",
                vec![Parameter::any()],
                |_| Ok(Value::from("exact")),
            )));
        });
    });

    let resolved = registry.resolve("pick", 1, &config).unwrap();
    assert_eq!(resolved.invoke(&[Value::Null]).unwrap(), Value::from("exact"));
}

// ============================================================================
// Namespaces
// ============================================================================

#[test]
fn test_date_namespace() {
    let context = object(vec![("day", Value::from("2024-02-03"))]);
    let runtime = Runtime::default();

    assert_eq!(
        run(&runtime, "date.format(date.parse(day), '%d.%m.%Y')", &context).unwrap(),
        Value::from("03.02.2024")
    );
    assert_eq!(
        run(&runtime, "date.millis(day)", &context).unwrap(),
        Value::Long(Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap().timestamp_millis())
    );
    assert!(matches!(run(&runtime, "date.now()", &context).unwrap(), Value::Date(_)));
}

#[test]
fn test_date_ranges_and_zones() {
    let context = object(vec![("from", Value::from("2024-01-30")), ("to", Value::from("2024-02-01"))]);
    let runtime = Runtime::default();

    assert_eq!(
        run(&runtime, "date.range(from, to, '1d', '%d.%m')", &context).unwrap(),
        Value::Array(vec![Value::from("30.01"), Value::from("31.01"), Value::from("01.02")])
    );
    assert_eq!(
        run(&runtime, "date.format(date.parse(from), '%H:%M', '-03:00')", &context).unwrap(),
        Value::from("21:00")
    );
}

#[test]
fn test_namespace_must_match() {
    let runtime = Runtime::default();
    // `now` only exists inside the date namespace
    assert!(run(&runtime, "now()", &Value::Null).is_err());
    assert!(run(&runtime, "date.substring('abc', 1)", &Value::Null).is_err());
}

struct Units;

impl NamespaceLoader for Units {
    fn load(&self, namespace: &str) -> Option<MethodGroup> {
        (namespace == "units").then(|| {
            MethodGroup::namespaced("units").with(MethodDescriptor::new(
                "km",
                vec![Parameter::of(ValueType::Float)],
                |args| Ok(Value::Float(args[0].as_f64().unwrap_or_default() / 1000.0)),
            ))
        })
    }
}

#[test]
fn test_namespace_loader() {
    let closed = Runtime::default();
    closed.methods().set_loader(Arc::new(Units));
    assert!(run(&closed, "units.km(1500)", &Value::Null).is_err());

    let open = Runtime::new(EvaluatorConfig {
        any_namespace: true,
        ..EvaluatorConfig::default()
    });
    open.methods().set_loader(Arc::new(Units));
    assert_eq!(run(&open, "units.km(1500)", &Value::Null).unwrap(), Value::Float(1.5));
    assert!(run(&open, "miles.km(1500)", &Value::Null).is_err());
}

// ============================================================================
// Computed targets
// ============================================================================

#[test]
fn test_function_values_are_callable() {
    let double = Arc::new(MethodDescriptor::new("double", vec![Parameter::of(ValueType::Integer)], |args| {
        Ok(Value::Integer(args[0].as_i64().unwrap_or_default() as i32 * 2))
    }));

    let runtime = Runtime::default();
    runtime.methods().register(
        MethodGroup::new()
            .with(MethodDescriptor::new("doubler", vec![], move |_| Ok(Value::Function(double.clone()))))
            .with(MethodDescriptor::new("named", vec![], |_| Ok(Value::from("substring")))),
    );

    assert_eq!(run(&runtime, "doubler()(21)", &Value::Null).unwrap(), Value::Integer(42));
    assert_eq!(run(&runtime, "named()('abc', 2)", &Value::Null).unwrap(), Value::from("c"));

    let error = run(&runtime, "doubler()(1, 2, 3)", &Value::Null).unwrap_err();
    assert!(matches!(error.root_cause(), EvaluationError::UnresolvedMethod { .. }));
}

#[test]
fn test_invocation_failure_is_wrapped() {
    let error = run(&Runtime::default(), "substring('abc', 5)", &Value::Null).unwrap_err();
    assert!(matches!(error, EvaluationError::Operation { ref expression, .. } if expression.contains("substring")));
    assert!(matches!(error.root_cause(), EvaluationError::Invocation { .. }));
}

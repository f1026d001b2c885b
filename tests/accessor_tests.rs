// tests/accessor_tests.rs

mod common;

use std::{
    any::Any,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use common::object;
use pathexpr::{
    AccessorRegistry, ContextAccessor, ContextType, Deferred, EvaluationError, EvaluatorConfig,
    HostObject, Runtime, Sequence, Value, accessor::lineage,
};
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct Employee {
    name: String,
}

impl HostObject for Employee {
    fn type_chain(&self) -> Vec<&'static str> {
        vec!["Employee", "Person"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(self.name.as_str())),
            "manager" => Some(Value::Null),
            _ => None,
        }
    }

    fn field_names(&self) -> Vec<String> {
        vec!["name".to_string(), "manager".to_string()]
    }

    fn annotation(&self, field: &str, annotation: &str) -> Option<Value> {
        (field == "name" && annotation == "label").then(|| Value::from("Full name"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn employee(name: &str) -> Value {
    Value::host(Employee { name: name.to_string() })
}

/// Answers every member with a fixed tag, to see which accessor was picked.
struct Tagged {
    context_type: ContextType,
    tag: &'static str,
}

impl ContextAccessor for Tagged {
    fn context_type(&self) -> ContextType {
        self.context_type
    }

    fn has(&self, _context: &Value, _name: &str) -> Result<bool, EvaluationError> {
        Ok(true)
    }

    fn get(&self, _context: &Value, _name: &str) -> Result<Value, EvaluationError> {
        Ok(Value::from(self.tag))
    }
}

// ============================================================================
// Lineage and resolution
// ============================================================================

#[test]
fn test_lineage() {
    assert_eq!(lineage(&object(vec![])), vec![ContextType::Map, ContextType::Any]);
    assert_eq!(
        lineage(&Value::Array(vec![])),
        vec![ContextType::List, ContextType::Collection, ContextType::Any]
    );
    assert_eq!(
        lineage(&employee("Ada")),
        vec![
            ContextType::Host("Employee"),
            ContextType::Host("Person"),
            ContextType::Any,
        ]
    );
    assert_eq!(lineage(&Value::Integer(1)), vec![ContextType::Scalar, ContextType::Any]);
}

#[test]
fn test_most_specific_accessor_wins() {
    let registry = AccessorRegistry::empty();
    registry.register(Arc::new(Tagged {
        context_type: ContextType::Any,
        tag: "any",
    }));
    registry.register(Arc::new(Tagged {
        context_type: ContextType::Host("Person"),
        tag: "person",
    }));
    assert_eq!(registry.get(&employee("Ada"), "name").unwrap(), Value::from("person"));

    registry.register(Arc::new(Tagged {
        context_type: ContextType::Host("Employee"),
        tag: "employee",
    }));
    assert_eq!(registry.get(&employee("Ada"), "name").unwrap(), Value::from("employee"));
    assert_eq!(registry.get(&Value::Integer(1), "x").unwrap(), Value::from("any"));
}

#[test]
fn test_later_registration_wins_on_ties() {
    let registry = AccessorRegistry::empty();
    registry.register(Arc::new(Tagged {
        context_type: ContextType::Map,
        tag: "first",
    }));
    registry.register(Arc::new(Tagged {
        context_type: ContextType::Map,
        tag: "second",
    }));
    assert_eq!(registry.get(&object(vec![]), "a").unwrap(), Value::from("second"));
}

#[test]
fn test_resolution_cache() {
    let registry = AccessorRegistry::default();
    assert_eq!(registry.cached_len(), 0);

    registry.get(&object(vec![]), "a").unwrap();
    registry.get(&object(vec![("b", Value::Integer(1))]), "b").unwrap();
    assert_eq!(registry.cached_len(), 1);

    registry.get(&Value::Array(vec![]), "$0").unwrap();
    assert_eq!(registry.cached_len(), 2);

    // registering drops what was resolved so far
    registry.register(Arc::new(Tagged {
        context_type: ContextType::Any,
        tag: "any",
    }));
    assert_eq!(registry.cached_len(), 0);
}

#[test]
fn test_registration_racing_resolution_is_not_lost() {
    let registry = AccessorRegistry::default();
    let context = object(vec![("a", Value::Integer(1))]);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..1_000 {
                registry.get(&context, "a").unwrap();
            }
        });
        scope.spawn(|| {
            registry.register(Arc::new(Tagged {
                context_type: ContextType::Map,
                tag: "tagged",
            }));
        });
    });

    assert_eq!(registry.get(&context, "a").unwrap(), Value::from("tagged"));
}

// ============================================================================
// Built-in accessors
// ============================================================================

#[test]
fn test_map_accessor() {
    let registry = AccessorRegistry::default();
    let mut context = object(vec![("b", Value::Integer(2)), ("a", Value::Null)]);

    assert!(registry.has(&context, "a").unwrap());
    assert!(!registry.has(&context, "c").unwrap());
    assert_eq!(registry.list(&context), Some(vec!["a".to_string(), "b".to_string()]));

    registry.set(&mut context, "c", Value::Integer(3)).unwrap();
    assert_eq!(registry.get(&context, "c").unwrap(), Value::Integer(3));
}

#[test]
fn test_host_fallback() {
    let registry = AccessorRegistry::default();
    let mut ada = employee("Ada");

    assert_eq!(registry.get(&ada, "name").unwrap(), Value::from("Ada"));
    assert!(registry.has(&ada, "manager").unwrap());
    assert!(!registry.has_value(&ada, "manager").unwrap());
    assert_eq!(registry.annotation(&ada, "name", "label"), Some(Value::from("Full name")));
    assert!(registry.set(&mut ada, "name", Value::from("Grace")).is_err());

    let name = pathexpr::parse("name").unwrap().evaluate(&ada).unwrap();
    assert_eq!(name, Value::from("Ada"));
}

#[test]
fn test_null_context_has_no_members() {
    let registry = AccessorRegistry::default();
    assert_eq!(registry.get(&Value::Null, "a").unwrap(), Value::Null);
    assert!(!registry.has(&Value::Null, "a").unwrap());
    assert_eq!(registry.list(&Value::Null), Some(vec![]));
}

// ============================================================================
// Sequences
// ============================================================================

#[test]
fn test_sequence_positions_resolve_deferred_elements() {
    let computed = Arc::new(AtomicUsize::new(0));
    let counter = computed.clone();
    let deferred = Deferred::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Integer(20))
    });
    let sequence = Value::Sequence(Sequence::new(move || {
        vec![Value::Integer(10), Value::Deferred(deferred.clone()), Value::Integer(30)].into_iter()
    }));

    let registry = AccessorRegistry::default();
    assert_eq!(registry.get(&sequence, "$1").unwrap(), Value::Integer(20));
    assert_eq!(registry.get(&sequence, "$1").unwrap(), Value::Integer(20));
    assert_eq!(registry.get(&sequence, "$9").unwrap(), Value::Null);
    assert_eq!(computed.load(Ordering::SeqCst), 1);

    let context = object(vec![("values", sequence)]);
    assert_eq!(
        pathexpr::parse("values[1]").unwrap().evaluate(&context).unwrap(),
        Value::Integer(20)
    );
    assert_eq!(
        pathexpr::parse("values[$this > 15]").unwrap().evaluate(&context).unwrap(),
        Value::Array(vec![Value::Integer(20), Value::Integer(30)])
    );
}

// ============================================================================
// Custom accessors in evaluation
// ============================================================================

/// Exposes a string's length and case variants as members.
struct TextAccessor;

impl ContextAccessor for TextAccessor {
    fn context_type(&self) -> ContextType {
        ContextType::Scalar
    }

    fn has(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        Ok(context.as_str().is_some() && matches!(name, "length" | "upper"))
    }

    fn get(&self, context: &Value, name: &str) -> Result<Value, EvaluationError> {
        let Some(text) = context.as_str() else {
            return Ok(Value::Null);
        };
        Ok(match name {
            "length" => Value::Integer(text.chars().count() as i32),
            "upper" => Value::from(text.to_uppercase()),
            _ => Value::Null,
        })
    }
}

#[test]
fn test_registered_accessor_drives_paths() {
    let runtime = Runtime::new(EvaluatorConfig::default());
    runtime.accessors().register(Arc::new(TextAccessor));

    let context = object(vec![("city", Value::from("Oslo"))]);
    let operation = pathexpr::parse("city/upper").unwrap();
    assert_eq!(runtime.evaluate(&operation, &context).unwrap(), Value::from("OSLO"));

    let operation = pathexpr::parse("city/length > 3").unwrap();
    assert_eq!(runtime.evaluate(&operation, &context).unwrap(), Value::Boolean(true));
}

use super::{ContextAccessor, ContextType};
use crate::{evaluator::EvaluationError, value::Value};

/// Fallback accessor, used when nothing registered matches a value.
///
/// Host objects answer through their own [`HostObject`](crate::HostObject)
/// members. Every other value has no named members.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostAccessor;

impl ContextAccessor for HostAccessor {
    fn context_type(&self) -> ContextType {
        ContextType::Any
    }

    fn has(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        Ok(match context {
            Value::Host(host) => host.field_names().iter().any(|f| f == name) || host.field(name).is_some(),
            _ => false,
        })
    }

    fn get(&self, context: &Value, name: &str) -> Result<Value, EvaluationError> {
        match context {
            Value::Host(host) => Ok(host.field(name).unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }
    }

    fn has_value(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        Ok(match context {
            Value::Host(host) => host.field(name).is_some_and(|v| !v.is_null()),
            _ => false,
        })
    }

    fn list(&self, context: &Value) -> Option<Vec<String>> {
        match context {
            Value::Host(host) => Some(host.field_names()),
            _ => None,
        }
    }

    fn set(&self, context: &mut Value, name: &str, value: Value) -> Result<(), EvaluationError> {
        match context {
            Value::Host(host) => host.set_field(name, value),
            other => Err(EvaluationError::Unsupported(format!(
                "cannot set '{}' on {}",
                name,
                other.value_type()
            ))),
        }
    }

    fn annotation(&self, context: &Value, field: &str, annotation: &str) -> Option<Value> {
        match context {
            Value::Host(host) => host.annotation(field, annotation),
            _ => None,
        }
    }
}

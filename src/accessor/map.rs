use super::{ContextAccessor, ContextType};
use crate::{evaluator::EvaluationError, value::Value};

/// Members of an object are its keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapAccessor;

impl ContextAccessor for MapAccessor {
    fn context_type(&self) -> ContextType {
        ContextType::Map
    }

    fn has(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        Ok(matches!(context, Value::Object(map) if map.contains_key(name)))
    }

    fn get(&self, context: &Value, name: &str) -> Result<Value, EvaluationError> {
        match context {
            Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }
    }

    fn list(&self, context: &Value) -> Option<Vec<String>> {
        match context {
            Value::Object(map) => {
                let mut keys: Vec<String> = map.keys().cloned().collect();
                keys.sort();
                Some(keys)
            }
            _ => None,
        }
    }

    fn set(&self, context: &mut Value, name: &str, value: Value) -> Result<(), EvaluationError> {
        match context {
            Value::Object(map) => {
                map.insert(name.to_string(), value);
                Ok(())
            }
            other => Err(EvaluationError::Unsupported(format!(
                "cannot set '{}' on {}",
                name,
                other.value_type()
            ))),
        }
    }
}

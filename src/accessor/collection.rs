use super::{ContextAccessor, ContextType};
use crate::{evaluator::EvaluationError, value::Value};

/// Positional members of arrays and sequences, named `$0`, `$1`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionAccessor;

/// The position named by `$N`, if `name` has that shape.
pub fn dollar_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('$')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl ContextAccessor for CollectionAccessor {
    fn context_type(&self) -> ContextType {
        ContextType::Collection
    }

    fn has(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        let Some(index) = dollar_index(name) else {
            return Ok(false);
        };
        Ok(match context {
            Value::Array(items) => index < items.len(),
            Value::Sequence(sequence) => sequence.iter().nth(index).is_some(),
            _ => false,
        })
    }

    fn get(&self, context: &Value, name: &str) -> Result<Value, EvaluationError> {
        let Some(index) = dollar_index(name) else {
            return Ok(Value::Null);
        };
        match context {
            Value::Array(items) => items.get(index).cloned().unwrap_or(Value::Null).resolved(),
            Value::Sequence(sequence) => sequence.nth(index),
            _ => Ok(Value::Null),
        }
    }

    fn list(&self, context: &Value) -> Option<Vec<String>> {
        let len = context.elements()?.count();
        Some((0..len).map(|i| format!("${}", i)).collect())
    }

    fn set(&self, context: &mut Value, name: &str, value: Value) -> Result<(), EvaluationError> {
        let slot = match (context, dollar_index(name)) {
            (Value::Array(items), Some(index)) => items.get_mut(index),
            _ => None,
        };
        match slot {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EvaluationError::Unsupported(format!(
                "cannot set '{}' on this collection",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dollar_index() {
        assert_eq!(dollar_index("$0"), Some(0));
        assert_eq!(dollar_index("$12"), Some(12));
        assert_eq!(dollar_index("$"), None);
        assert_eq!(dollar_index("$this"), None);
        assert_eq!(dollar_index("name"), None);
    }
}

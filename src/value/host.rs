use std::{any::Any, fmt, sync::Arc};

use crate::{ast::TokenKind, evaluator::EvaluationError, value::Value};

/// A value owned by the embedding application.
///
/// Host objects are reached by name through the accessor registry. When no
/// accessor is registered for a host type, the registry falls back to the
/// methods below, so a host type only has to implement the ones it needs.
///
/// `type_chain` names the type and its ancestors, most specific first. An
/// accessor registered for any name in the chain applies to the object, and
/// the one registered for the earliest name wins.
///
/// # Examples
///
/// ```
/// use pathexpr::{HostObject, Value};
/// use std::{any::Any, sync::Arc};
///
/// #[derive(Debug)]
/// struct Employee {
///     name: String,
/// }
///
/// impl HostObject for Employee {
///     fn type_chain(&self) -> Vec<&'static str> {
///         vec!["Employee", "Person"]
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(Value::from(self.name.as_str())),
///             _ => None,
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
///
/// let employee = Value::Host(Arc::new(Employee { name: "Ada".into() }));
/// let name = pathexpr::parse("name").unwrap().evaluate(&employee).unwrap();
/// assert_eq!(name, Value::from("Ada"));
/// ```
pub trait HostObject: fmt::Debug + Send + Sync {
    /// Type name followed by ancestor type names.
    fn type_chain(&self) -> Vec<&'static str>;

    /// Reads a named member. `None` means the member does not exist.
    fn field(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Names of readable members.
    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Writes a named member.
    fn set_field(&self, name: &str, _value: Value) -> Result<(), EvaluationError> {
        Err(EvaluationError::Unsupported(format!(
            "member '{}' of {} is read-only",
            name,
            self.type_chain().first().copied().unwrap_or("host object")
        )))
    }

    /// Metadata attached to a member, e.g. a validation or display hint.
    fn annotation(&self, _field: &str, _annotation: &str) -> Option<Value> {
        None
    }

    /// Operator capability hook.
    ///
    /// Called with the host object as the left operand (or the only operand
    /// for `++` and `--`). Returning `None` falls through to the built-in
    /// operator semantics.
    fn apply_operator(
        &self,
        _operator: TokenKind,
        _right: &Value,
    ) -> Option<Result<Value, EvaluationError>> {
        None
    }

    fn equals(&self, other: &dyn HostObject) -> bool {
        std::ptr::addr_eq(self.as_any(), other.as_any())
    }

    fn as_any(&self) -> &dyn Any;
}

impl Value {
    /// Downcasts a host value to its concrete type.
    pub fn host_ref<T: HostObject + 'static>(&self) -> Option<&T> {
        match self {
            Value::Host(host) => host.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn host<T: HostObject + 'static>(object: T) -> Value {
        Value::Host(Arc::new(object))
    }
}

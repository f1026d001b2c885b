use std::sync::Arc;

use tracing::trace;

use super::{EvalContext, EvaluationError};
use crate::{
    ast::{MethodOperation, MethodTarget},
    convert::Converter,
    methods::{MethodDescriptor, Parameter},
    value::{Value, ValueType},
};

impl MethodOperation {
    pub(crate) fn evaluate(
        &self,
        context: &Value,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let arguments = self
            .arguments()
            .iter()
            .map(|argument| argument.evaluate_with(context, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        let method = self.target_method(context, arguments.len(), ctx)?;
        let bound = bind(&method, arguments, ctx.runtime().converter())?;
        trace!(method = method.name(), arguments = bound.len(), "invoking method");
        method.invoke(&bound)
    }

    fn target_method(
        &self,
        context: &Value,
        arity: usize,
        ctx: &EvalContext<'_>,
    ) -> Result<Arc<MethodDescriptor>, EvaluationError> {
        let runtime = ctx.runtime();
        let config = runtime.config();
        match self.target() {
            MethodTarget::Name(name) => runtime.methods().resolve(name, arity, config),
            MethodTarget::Operation(target) => {
                match target.evaluate_with(context, ctx)?.resolved()? {
                    Value::Function(function) => {
                        if function.fit(arity, config.null_completion).is_none() {
                            return Err(EvaluationError::UnresolvedMethod {
                                name: function.name().to_string(),
                                arity,
                            });
                        }
                        Ok(function)
                    }
                    Value::String(name) => runtime.methods().resolve(&name, arity, config),
                    other => Err(EvaluationError::Unsupported(format!(
                        "{} '{}' is not callable",
                        other.value_type(),
                        other
                    ))),
                }
            }
        }
    }
}

/// Lines arguments up with the declared parameters.
///
/// A trailing variadic parameter receives the remaining arguments as one
/// array; missing arguments of a null-completed call are null. Each value is
/// converted to its parameter's type when one is declared.
fn bind(
    method: &MethodDescriptor,
    arguments: Vec<Value>,
    converter: &dyn Converter,
) -> Result<Vec<Value>, EvaluationError> {
    let coerce = |value: Value, value_type: Option<ValueType>| -> Result<Value, EvaluationError> {
        match value_type {
            Some(value_type) => Ok(converter.convert(&value, value_type)?),
            None => Ok(value),
        }
    };

    let mut arguments = arguments.into_iter();
    let mut bound = Vec::with_capacity(method.parameters().len());
    for parameter in method.parameters() {
        match *parameter {
            Parameter::Value(value_type) => {
                bound.push(coerce(arguments.next().unwrap_or(Value::Null), value_type)?);
            }
            Parameter::Variadic(value_type) => {
                let rest = arguments
                    .by_ref()
                    .map(|value| coerce(value, value_type))
                    .collect::<Result<Vec<_>, _>>()?;
                bound.push(Value::Array(rest));
            }
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::StandardConverter;

    fn echo(parameters: Vec<Parameter>) -> MethodDescriptor {
        MethodDescriptor::new("echo", parameters, |args| Ok(Value::Array(args.to_vec())))
    }

    #[test]
    fn test_bind_pads_with_nulls() {
        let method = echo(vec![Parameter::any(), Parameter::any()]);
        let bound = bind(&method, vec![Value::Integer(1)], &StandardConverter).unwrap();
        assert_eq!(bound, vec![Value::Integer(1), Value::Null]);
    }

    #[test]
    fn test_bind_collects_variadic_tail() {
        let method = echo(vec![
            Parameter::of(ValueType::String),
            Parameter::Variadic(Some(ValueType::Long)),
        ]);
        let bound = bind(
            &method,
            vec![Value::Integer(1), Value::from("2"), Value::Integer(3)],
            &StandardConverter,
        )
        .unwrap();
        assert_eq!(
            bound,
            vec![
                Value::from("1"),
                Value::Array(vec![Value::Long(2), Value::Long(3)]),
            ]
        );

        let empty = bind(&method, vec![Value::from("a")], &StandardConverter).unwrap();
        assert_eq!(empty[1], Value::Array(vec![]));
    }

    #[test]
    fn test_bind_reports_failed_coercion() {
        let method = echo(vec![Parameter::of(ValueType::Integer)]);
        let result = bind(&method, vec![Value::from("abc")], &StandardConverter);
        assert!(matches!(result, Err(EvaluationError::Conversion(_))));
    }
}

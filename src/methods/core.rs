//! Methods available by bare name.

use super::{MethodDescriptor, MethodGroup, Parameter};
use crate::{
    analyzer::LIST_METHOD,
    evaluator::EvaluationError,
    value::{Value, ValueType},
};

pub fn group() -> MethodGroup {
    MethodGroup::new()
        .with(MethodDescriptor::new("choose", vec![Parameter::Variadic(None)], choose))
        .with(MethodDescriptor::new("exists", vec![Parameter::any()], |args| {
            Ok(Value::Boolean(!args[0].is_null()))
        }))
        .with(MethodDescriptor::new(
            "not",
            vec![Parameter::of(ValueType::Boolean)],
            |args| Ok(Value::Boolean(args[0].as_bool() != Some(true))),
        ))
        .with(MethodDescriptor::new(
            "substring",
            vec![Parameter::of(ValueType::String), Parameter::of(ValueType::Integer)],
            |args| substring(&args[0], &args[1], None),
        ))
        .with(MethodDescriptor::new(
            "substring",
            vec![
                Parameter::of(ValueType::String),
                Parameter::of(ValueType::Integer),
                Parameter::of(ValueType::Integer),
            ],
            |args| substring(&args[0], &args[1], Some(&args[2])),
        ))
        .with(MethodDescriptor::new(
            "substringAfter",
            vec![Parameter::of(ValueType::String), Parameter::of(ValueType::String)],
            substring_after,
        ))
        .with(MethodDescriptor::new("count", vec![Parameter::any()], count))
        .with(MethodDescriptor::new(
            LIST_METHOD,
            vec![Parameter::Variadic(None)],
            |args| Ok(args[0].clone()),
        ))
}

/// The first argument that is not null.
fn choose(args: &[Value]) -> Result<Value, EvaluationError> {
    let Value::Array(candidates) = &args[0] else {
        return Ok(Value::Null);
    };
    Ok(candidates
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn substring(text: &Value, offset: &Value, length: Option<&Value>) -> Result<Value, EvaluationError> {
    let Some(text) = text.as_str() else {
        return Ok(Value::Null);
    };
    let chars: Vec<char> = text.chars().collect();
    let start = index_arg("substring", offset)?;
    let end = match length {
        Some(length) => start + index_arg("substring", length)?,
        None => chars.len(),
    };
    if start > chars.len() || end > chars.len() {
        return Err(EvaluationError::Invocation {
            name: "substring".to_string(),
            message: format!("range {}..{} is outside a string of length {}", start, end, chars.len()),
        });
    }
    Ok(Value::String(chars[start..end].iter().collect()))
}

/// Everything after the first occurrence of the target; the whole text when it does not occur.
fn substring_after(args: &[Value]) -> Result<Value, EvaluationError> {
    let (Some(text), Some(target)) = (args[0].as_str(), args[1].as_str()) else {
        return Ok(Value::Null);
    };
    let rest = match text.find(target) {
        Some(at) => &text[at + target.len()..],
        None => text,
    };
    Ok(Value::from(rest))
}

/// Elements of a list; any other value counts as one.
fn count(args: &[Value]) -> Result<Value, EvaluationError> {
    let n = match args[0].elements() {
        Some(elements) => elements.count(),
        None => 1,
    };
    i32::try_from(n)
        .map(Value::Integer)
        .or_else(|_| Ok(Value::Long(n as i64)))
}

fn index_arg(name: &str, value: &Value) -> Result<usize, EvaluationError> {
    value
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| EvaluationError::Invocation {
            name: name.to_string(),
            message: format!("expected a non-negative index, got '{}'", value),
        })
}

//! Built-in operator semantics.
//!
//! The left operand decides the type of the computation: the right operand
//! is converted to it before comparing or calculating. Host executors and
//! host operator capabilities are asked first, when overloading is enabled.

use std::cmp::Ordering;

use num_bigint::BigInt;
use rust_decimal::{Decimal, MathematicalOps, prelude::Zero};
use tracing::trace;

use super::{EvalContext, EvaluationError, evaluate_part};
use crate::{
    ast::{ClassicOperation, TokenKind},
    convert::Converter,
    runtime::Runtime,
    value::{Value, ValueType},
};

const RELATIVE_EPSILON: f64 = 1e-15;
const ABSOLUTE_EPSILON: f64 = 1e-20;

impl ClassicOperation {
    pub(crate) fn evaluate(
        &self,
        context: &Value,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let operator = self.operator();
        let runtime = ctx.runtime();
        let converter = runtime.converter();

        let left = match self.left() {
            Some(part) if operator.has_left_operand() => evaluate_part(part, context, ctx)?,
            _ => Value::Null,
        };

        // the right operand is never evaluated once the left one decides
        match operator {
            TokenKind::LogicalAnd
                if left.is_null() || to_bool(&left, converter) == Some(false) =>
            {
                return Ok(Value::Boolean(false));
            }
            TokenKind::LogicalOr
                if !left.is_null() && to_bool(&left, converter) != Some(false) =>
            {
                return Ok(Value::Boolean(true));
            }
            _ => {}
        }

        let right = match self.right() {
            Some(part) if operator.has_right_operand() => evaluate_part(part, context, ctx)?,
            _ => Value::Null,
        };

        if runtime.config().operator_overloading {
            for executor in runtime.executors() {
                if executor.supports(&left, operator, &right) {
                    trace!(%operator, "operator handled by executor");
                    return executor.calculate(&left, operator, &right);
                }
            }
            if let Value::Host(host) = &left
                && let Some(result) = host.apply_operator(operator, &right)
            {
                return result;
            }
        }

        apply(runtime, operator, left, right)
    }
}

fn apply(
    runtime: &Runtime,
    operator: TokenKind,
    left: Value,
    right: Value,
) -> Result<Value, EvaluationError> {
    let converter = runtime.converter();
    match operator {
        TokenKind::Add => add(left, right, runtime),
        TokenKind::Subtract => subtract(left, right, runtime),
        TokenKind::Multiply | TokenKind::Divide | TokenKind::Mod => {
            let left = widen(left, &right, runtime)?;
            arithmetic(operator, left, right, runtime)
        }
        TokenKind::Power => power(left, right, runtime),
        TokenKind::Increase => arithmetic(TokenKind::Add, left, Value::Integer(1), runtime),
        TokenKind::Decrease => arithmetic(TokenKind::Subtract, left, Value::Integer(1), runtime),

        TokenKind::BitwiseAnd => {
            Ok(Value::Boolean(strict_bool(&left, converter)? & strict_bool(&right, converter)?))
        }
        TokenKind::BitwiseOr => {
            Ok(Value::Boolean(strict_bool(&left, converter)? | strict_bool(&right, converter)?))
        }
        TokenKind::Xor => {
            Ok(Value::Boolean(strict_bool(&left, converter)? != strict_bool(&right, converter)?))
        }
        TokenKind::NotXor => {
            Ok(Value::Boolean(strict_bool(&left, converter)? == strict_bool(&right, converter)?))
        }
        TokenKind::LogicalAnd => {
            Ok(Value::Boolean(lenient_bool(&left, converter) && lenient_bool(&right, converter)))
        }
        TokenKind::LogicalOr => {
            Ok(Value::Boolean(lenient_bool(&left, converter) || lenient_bool(&right, converter)))
        }
        TokenKind::Not => Ok(Value::Boolean(match to_bool(&right, converter) {
            _ if right.is_null() => true,
            Some(b) => !b,
            None => false,
        })),

        TokenKind::Equals => Ok(Value::Boolean(equals(&left, &right, converter))),
        TokenKind::NotEquals => Ok(Value::Boolean(!equals(&left, &right, converter))),
        TokenKind::Greater
        | TokenKind::GreaterOrEquals
        | TokenKind::Lesser
        | TokenKind::LesserOrEquals => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Boolean(false));
            }
            let ordering = compare(&left, &right, converter)?;
            Ok(Value::Boolean(match operator {
                TokenKind::Greater => ordering == Some(Ordering::Greater),
                TokenKind::GreaterOrEquals => ordering.is_some_and(Ordering::is_ge),
                TokenKind::Lesser => ordering == Some(Ordering::Less),
                _ => ordering.is_some_and(Ordering::is_le),
            }))
        }
        TokenKind::In => Ok(Value::Boolean(contains(&right, &left, converter)?)),
        TokenKind::NotIn => Ok(Value::Boolean(!contains(&right, &left, converter)?)),
        TokenKind::Matches | TokenKind::NotMatches => {
            if left.is_null() {
                return Ok(Value::Boolean(operator == TokenKind::NotMatches));
            }
            let matched = runtime.regex(&right.to_text())?.is_match(&left.to_text());
            Ok(Value::Boolean(matched == (operator == TokenKind::Matches)))
        }

        other => Err(EvaluationError::Unsupported(format!(
            "{} has no evaluation rule",
            other
        ))),
    }
}

// ========================================
// Arithmetic
// ========================================

fn add(left: Value, right: Value, runtime: &Runtime) -> Result<Value, EvaluationError> {
    let left = match left {
        Value::Null if matches!(right, Value::String(_)) => Value::from("null"),
        Value::Null => return Err(missing_operand(TokenKind::Add)),
        other => widen(other, &right, runtime)?,
    };
    if let Value::String(mut text) = left {
        text.push_str(&right.to_text());
        return Ok(Value::String(text));
    }
    arithmetic(TokenKind::Add, left, right, runtime)
}

/// A null left operand counts as zero; a non-numeric one is read as a float.
fn subtract(left: Value, right: Value, runtime: &Runtime) -> Result<Value, EvaluationError> {
    let converter = runtime.converter();
    let left = match left {
        Value::Null if right.is_numeric() => converter.convert(&Value::Long(0), right.value_type())?,
        Value::Null => Value::Long(0),
        other if !other.is_numeric() => converter.convert(&other, ValueType::Float)?,
        other => other,
    };
    let left = widen(left, &right, runtime)?;
    arithmetic(TokenKind::Subtract, left, right, runtime)
}

/// Integral and decimal bases take an integer exponent; other bases compute in floating point.
fn power(left: Value, right: Value, runtime: &Runtime) -> Result<Value, EvaluationError> {
    if left.is_null() || right.is_null() {
        return Err(missing_operand(TokenKind::Power));
    }
    let converter = runtime.converter();
    let left = widen(left, &right, runtime)?;
    match left {
        Value::BigInteger(base) => {
            let exponent = exponent(&right, converter)?;
            u32::try_from(exponent)
                .map(|e| Value::BigInteger(base.pow(e)))
                .map_err(|_| EvaluationError::Arithmetic(format!("invalid exponent '{}'", exponent)))
        }
        Value::Decimal(base) => {
            let exponent = exponent(&right, converter)?;
            base.checked_powi(exponent)
                .map(Value::Decimal)
                .ok_or_else(|| overflow(TokenKind::Power))
        }
        left if left.is_numeric() => {
            let right = converter.convert(&right, left.value_type())?;
            let (Some(base), Some(exponent)) = (left.as_f64(), right.as_f64()) else {
                return Err(undefined(TokenKind::Power, &left, &right));
            };
            Ok(converter.convert(&Value::Float(base.powf(exponent)), left.value_type())?)
        }
        left => Err(undefined(TokenKind::Power, &left, &right)),
    }
}

fn exponent(value: &Value, converter: &dyn Converter) -> Result<i64, EvaluationError> {
    converter
        .convert(value, ValueType::Integer)?
        .as_i64()
        .ok_or_else(|| EvaluationError::Arithmetic(format!("invalid exponent '{}'", value)))
}

/// Widens the left operand to the right operand's richer numeric type, when configured.
fn widen(left: Value, right: &Value, runtime: &Runtime) -> Result<Value, EvaluationError> {
    if !runtime.config().always_widen_numerics || !left.is_numeric() || !right.is_numeric() {
        return Ok(left);
    }
    let target = match (left.value_type(), right.value_type()) {
        (from, ValueType::Decimal) if from != ValueType::Decimal => ValueType::Decimal,
        (from, ValueType::BigInteger)
            if !matches!(from, ValueType::BigInteger | ValueType::Decimal) =>
        {
            ValueType::BigInteger
        }
        (from, ValueType::Float)
            if !matches!(from, ValueType::BigInteger | ValueType::Decimal | ValueType::Float) =>
        {
            ValueType::Float
        }
        (ValueType::Integer, ValueType::Long) => ValueType::Long,
        _ => return Ok(left),
    };
    Ok(runtime.converter().convert(&left, target)?)
}

/// Applies `+ - * / %` in the left operand's type. Integer overflow is an error.
fn arithmetic(
    operator: TokenKind,
    left: Value,
    right: Value,
    runtime: &Runtime,
) -> Result<Value, EvaluationError> {
    if left.is_null() || right.is_null() {
        return Err(missing_operand(operator));
    }
    if !left.is_numeric() {
        return Err(undefined(operator, &left, &right));
    }
    let right = runtime.converter().convert(&right, left.value_type())?;
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => i32::try_from(integral(operator, a.into(), b.into())?)
            .map(Value::Integer)
            .map_err(|_| overflow(operator)),
        (Value::Long(a), Value::Long(b)) => i64::try_from(integral(operator, a.into(), b.into())?)
            .map(Value::Long)
            .map_err(|_| overflow(operator)),
        (Value::BigInteger(a), Value::BigInteger(b)) => big_integral(operator, a, b).map(Value::BigInteger),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match operator {
            TokenKind::Add => a + b,
            TokenKind::Subtract => a - b,
            TokenKind::Multiply => a * b,
            TokenKind::Divide => a / b,
            _ => a % b,
        })),
        (Value::Decimal(a), Value::Decimal(b)) => {
            decimal(operator, a, b, runtime.config().decimal_precision).map(Value::Decimal)
        }
        (left, right) => Err(undefined(operator, &left, &right)),
    }
}

fn integral(operator: TokenKind, a: i128, b: i128) -> Result<i128, EvaluationError> {
    if b == 0 && matches!(operator, TokenKind::Divide | TokenKind::Mod) {
        return Err(EvaluationError::Arithmetic("division by zero".to_string()));
    }
    let result = match operator {
        TokenKind::Add => a.checked_add(b),
        TokenKind::Subtract => a.checked_sub(b),
        TokenKind::Multiply => a.checked_mul(b),
        TokenKind::Divide => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result.ok_or_else(|| overflow(operator))
}

/// Arbitrary-precision arithmetic never overflows; only division by zero fails.
fn big_integral(operator: TokenKind, a: BigInt, b: BigInt) -> Result<BigInt, EvaluationError> {
    if b.is_zero() && matches!(operator, TokenKind::Divide | TokenKind::Mod) {
        return Err(EvaluationError::Arithmetic("division by zero".to_string()));
    }
    Ok(match operator {
        TokenKind::Add => a + b,
        TokenKind::Subtract => a - b,
        TokenKind::Multiply => a * b,
        TokenKind::Divide => a / b,
        _ => a % b,
    })
}

/// Decimal arithmetic; quotients are rounded to `precision` significant digits (0 keeps all).
fn decimal(operator: TokenKind, a: Decimal, b: Decimal, precision: u32) -> Result<Decimal, EvaluationError> {
    if b.is_zero() && matches!(operator, TokenKind::Divide | TokenKind::Mod) {
        return Err(EvaluationError::Arithmetic("division by zero".to_string()));
    }
    let result = match operator {
        TokenKind::Add => a.checked_add(b),
        TokenKind::Subtract => a.checked_sub(b),
        TokenKind::Multiply => a.checked_mul(b),
        TokenKind::Divide => a
            .checked_div(b)
            .and_then(|q| if precision == 0 { Some(q) } else { q.round_sf(precision) }),
        _ => a.checked_rem(b),
    };
    result.ok_or_else(|| overflow(operator))
}

// ========================================
// Logic and comparison
// ========================================

fn to_bool(value: &Value, converter: &dyn Converter) -> Option<bool> {
    converter
        .convert(value, ValueType::Boolean)
        .ok()
        .and_then(|v| v.as_bool())
}

/// Null is false; anything else must convert.
fn strict_bool(value: &Value, converter: &dyn Converter) -> Result<bool, EvaluationError> {
    if value.is_null() {
        return Ok(false);
    }
    Ok(converter.convert(value, ValueType::Boolean)?.as_bool() == Some(true))
}

/// Null is false; a value without a boolean reading is true.
fn lenient_bool(value: &Value, converter: &dyn Converter) -> bool {
    !value.is_null() && to_bool(value, converter).unwrap_or(true)
}

/// Equality after converting `right` to the type of `left`.
///
/// Only null equals null, and a right operand that does not convert is unequal.
fn equals(left: &Value, right: &Value, converter: &dyn Converter) -> bool {
    if left.is_null() || right.is_null() {
        return left.is_null() && right.is_null();
    }
    match converter.convert(right, left.value_type()) {
        Ok(right) => same(left, &right),
        Err(e) => {
            trace!(error = %e, "operands are not comparable");
            false
        }
    }
}

/// Floats compare within a tolerance and dates to the millisecond.
fn same(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Float(a), Value::Float(b)) => close(*a, *b),
        (Value::Date(a), Value::Date(b)) => a.timestamp_millis() == b.timestamp_millis(),
        (a, b) => a == b,
    }
}

fn close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let difference = (a - b).abs();
    difference < ABSOLUTE_EPSILON || difference <= a.abs().max(b.abs()) * RELATIVE_EPSILON
}

fn compare(left: &Value, right: &Value, converter: &dyn Converter) -> Result<Option<Ordering>, EvaluationError> {
    let right = converter.convert(right, left.value_type())?;
    Ok(match (left, &right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
        (Value::BigInteger(a), Value::BigInteger(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.timestamp_millis().cmp(&b.timestamp_millis())),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => {
            return Err(EvaluationError::Unsupported(format!(
                "{} values have no ordering",
                left.value_type()
            )));
        }
    })
}

/// Membership of `needle` in a list, or case-insensitive containment in a string.
fn contains(haystack: &Value, needle: &Value, converter: &dyn Converter) -> Result<bool, EvaluationError> {
    match haystack {
        Value::Null => Ok(false),
        Value::String(text) => Ok(!needle.is_null()
            && text.to_lowercase().contains(&needle.to_text().to_lowercase())),
        list if list.is_list_like() => {
            for element in list.elements().into_iter().flatten() {
                let element = element.resolved()?;
                if element.is_null() || needle.is_null() {
                    if element.is_null() && needle.is_null() {
                        return Ok(true);
                    }
                    continue;
                }
                if let Ok(candidate) = converter.convert(&element, needle.value_type())
                    && same(needle, &candidate)
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        other => Err(EvaluationError::Unsupported(format!(
            "membership in {}",
            other.value_type()
        ))),
    }
}

// ========================================
// Errors
// ========================================

fn missing_operand(operator: TokenKind) -> EvaluationError {
    EvaluationError::Arithmetic(format!("{} with a null operand", operator))
}

fn overflow(operator: TokenKind) -> EvaluationError {
    EvaluationError::Arithmetic(format!("{} overflows", operator))
}

fn undefined(operator: TokenKind, left: &Value, right: &Value) -> EvaluationError {
    EvaluationError::Unsupported(format!(
        "{} is not defined for {} and {}",
        operator,
        left.value_type(),
        right.value_type()
    ))
}

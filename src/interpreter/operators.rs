use super::errors::RuntimeError;
use super::value::Value;
use crate::ast::InfixOp;
use std::cmp::Ordering;

/// Applies an eager binary operator. Short-circuiting operators and the
/// object-aware `instanceof` / `in` are handled by the evaluator.
pub fn binary(op: InfixOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match op {
        InfixOp::Add => add(left, right),
        InfixOp::Subtract => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        InfixOp::Multiply => arithmetic(op, left, right, i64::checked_mul, |a, b| a * b),
        InfixOp::Divide => divide(left, right),
        InfixOp::Modulo => modulo(left, right),
        InfixOp::Power => power(left, right),
        InfixOp::Equal => Ok(Value::Bool(left.equals(right))),
        InfixOp::NotEqual => Ok(Value::Bool(!left.equals(right))),
        InfixOp::Less => compare(op, left, right).map(|o| Value::Bool(o == Ordering::Less)),
        InfixOp::LessEqual => compare(op, left, right).map(|o| Value::Bool(o != Ordering::Greater)),
        InfixOp::Greater => compare(op, left, right).map(|o| Value::Bool(o == Ordering::Greater)),
        InfixOp::GreaterEqual => compare(op, left, right).map(|o| Value::Bool(o != Ordering::Less)),
        InfixOp::And | InfixOp::Or | InfixOp::InstanceOf | InfixOp::In => Err(
            RuntimeError::type_error(format!("operator '{}' needs evaluator context", op.symbol())),
        ),
    }
}

fn mismatch(op: InfixOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "cannot apply '{}' to {} and {}",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn add(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),
        (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::Array(a), Value::Array(b)) => {
            let mut joined = a.borrow().clone();
            joined.extend(b.borrow().iter().cloned());
            Ok(Value::array(joined))
        }
        _ => arithmetic(InfixOp::Add, left, right, i64::checked_add, |a, b| a + b),
    }
}

/// Int op Int stays integral unless it overflows, in which case the result
/// is computed in floating point.
fn arithmetic(
    op: InfixOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(match int_op(*a, *b) {
            Some(n) => Value::Int(n),
            None => Value::Float(float_op(*a as f64, *b as f64)),
        }),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(mismatch(op, left, right)),
        },
    }
}

fn is_zero(value: &Value) -> bool {
    matches!(value, Value::Int(0)) || matches!(value, Value::Float(f) if *f == 0.0)
}

fn divide(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    if left.as_f64().is_some() && is_zero(right) {
        return Err(RuntimeError::DivisionByZero);
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) if a.checked_rem(*b) == Some(0) => Ok(match a.checked_div(*b) {
            Some(n) => Value::Int(n),
            None => Value::Float(*a as f64 / *b as f64),
        }),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a / b)),
            _ => Err(mismatch(InfixOp::Divide, left, right)),
        },
    }
}

fn modulo(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    if left.as_f64().is_some() && is_zero(right) {
        return Err(RuntimeError::DivisionByZero);
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.checked_rem(*b).unwrap_or(0))),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a % b)),
            _ => Err(mismatch(InfixOp::Modulo, left, right)),
        },
    }
}

fn power(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(base), Value::Int(exp)) if *exp >= 0 => {
            let exact = u32::try_from(*exp).ok().and_then(|e| base.checked_pow(e));
            Ok(match exact {
                Some(n) => Value::Int(n),
                None => Value::Float((*base as f64).powf(*exp as f64)),
            })
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a.powf(b))),
            _ => Err(mismatch(InfixOp::Power, left, right)),
        },
    }
}

fn compare(op: InfixOp, left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            // NaN compares as neither less nor greater
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
            _ => Err(mismatch(op, left, right)),
        },
    }
}

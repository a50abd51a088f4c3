//=====================================================
// File: builtins/array.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Array built-ins
// Objective: Mutating (dhokao, berKoro) and copying (kato, ulto, saja)
//            operations plus the higher-order family over snapshots
//=====================================================

use super::string::clamp_offset;
use super::{
    arg, array_arg, at_least, between, callable_arg, exact, fit_args, int_arg, register_async,
    register_sync,
};
use crate::interpreter::{EvalResult, Interpreter, LocalBoxFuture, RuntimeError, Value, contains};
use std::cmp::Ordering;

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "dhokao", at_least(2), push);
    register_sync(interpreter, "berKoro", exact(1), pop);
    register_sync(interpreter, "kato", between(2, 3), slice);
    register_sync(interpreter, "ulto", exact(1), reverse);
    register_async(interpreter, "saja", between(1, 2), sort);
    register_sync(interpreter, "ache", exact(2), includes);
    register_sync(interpreter, "joro", between(1, 2), join);
    register_async(interpreter, "roopantor", exact(2), map_items);
    register_async(interpreter, "chhanno", exact(2), filter_items);
    register_async(interpreter, "sonkkhep", between(2, 3), reduce_items);
    register_async(interpreter, "proti", exact(2), for_each);
}

//=============================================
//            Section 1: Mutation & Copies
//=============================================

/// Appends in place; returns the new length.
fn push(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let items = array_arg("dhokao", args, 0)?;
    let mut items = items.borrow_mut();
    items.extend(args[1..].iter().cloned());
    Ok(Value::Int(items.len() as i64))
}

/// Removes and returns the last element, or `khali` when empty.
fn pop(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let items = array_arg("berKoro", args, 0)?;
    let last = items.borrow_mut().pop();
    Ok(last.unwrap_or(Value::Null))
}

fn slice(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let items = array_arg("kato", args, 0)?;
    let items = items.borrow();
    let start = clamp_offset(int_arg("kato", args, 1)?, items.len());
    let end = match args.get(2) {
        Some(_) => clamp_offset(int_arg("kato", args, 2)?, items.len()),
        None => items.len(),
    };
    let copied = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Ok(Value::array(copied))
}

fn reverse(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let mut copied = array_arg("ulto", args, 0)?.borrow().clone();
    copied.reverse();
    Ok(Value::array(copied))
}

fn includes(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    Ok(Value::Bool(contains(&args[0], &args[1])?))
}

/// Joins with `sep` (default `,`) using `lipi` conversion.
fn join(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let items = array_arg("joro", args, 0)?;
    let separator = match args.get(1) {
        Some(_) => super::string_arg("joro", args, 1)?.to_string(),
        None => ",".to_string(),
    };
    let joined = items
        .borrow()
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::String(joined))
}

//=============================================
//            Section 2: Sorting
//=============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NaturalKind {
    Int,
    Number,
    Text,
}

fn unsortable(a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::argument(format!(
        "saja cannot compare {} with {}",
        a.type_name(),
        b.type_name()
    ))
}

/// Picks one ordering for the whole array: exact integers, numbers (NaN
/// ranked by `f64::total_cmp`) or strings. Mixing strings with numbers, or
/// any other type, is an error.
fn natural_kind(items: &[Value]) -> Result<Option<NaturalKind>, RuntimeError> {
    let Some(first) = items.first() else {
        return Ok(None);
    };
    let mut kind: Option<NaturalKind> = None;
    for item in items {
        let next = match item {
            Value::Int(_) => NaturalKind::Int,
            Value::Float(_) => NaturalKind::Number,
            Value::String(_) => NaturalKind::Text,
            other => return Err(unsortable(first, other)),
        };
        kind = Some(match (kind, next) {
            (None, next) => next,
            (Some(NaturalKind::Text), NaturalKind::Text) => NaturalKind::Text,
            (Some(NaturalKind::Text), _) | (Some(_), NaturalKind::Text) => {
                return Err(unsortable(first, item));
            }
            (Some(NaturalKind::Int), NaturalKind::Int) => NaturalKind::Int,
            _ => NaturalKind::Number,
        });
    }
    Ok(kind)
}

fn natural_order(kind: NaturalKind, a: &Value, b: &Value) -> Ordering {
    match (kind, a, b) {
        (NaturalKind::Int, Value::Int(x), Value::Int(y)) => x.cmp(y),
        (NaturalKind::Text, Value::String(x), Value::String(y)) => x.cmp(y),
        _ => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
    }
}

/// Returns a sorted copy. A comparator returns a negative number, zero or a
/// positive number. Stable.
fn sort<'a>(interpreter: &'a Interpreter, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        let mut items = array_arg("saja", &args, 0)?.borrow().clone();
        let comparator = match args.get(1) {
            Some(_) => Some(callable_arg("saja", &args, 1)?),
            None => None,
        };

        let Some(comparator) = comparator else {
            if let Some(kind) = natural_kind(&items)? {
                items.sort_by(|a, b| natural_order(kind, a, b));
            }
            return Ok(Value::array(items));
        };

        // bottom-up merge sort; the comparator may suspend
        let mut width = 1;
        while width < items.len() {
            let mut merged = Vec::with_capacity(items.len());
            for chunk in items.chunks(width * 2) {
                let (left, right) = chunk.split_at(width.min(chunk.len()));
                let (mut i, mut j) = (0, 0);
                while i < left.len() && j < right.len() {
                    let verdict = interpreter
                        .call_value(
                            comparator.clone(),
                            fit_args(&comparator, vec![left[i].clone(), right[j].clone()]),
                        )
                        .await?;
                    let verdict = verdict.as_f64().ok_or_else(|| {
                        RuntimeError::argument("saja comparator must return a number")
                    })?;
                    if verdict <= 0.0 {
                        merged.push(left[i].clone());
                        i += 1;
                    } else {
                        merged.push(right[j].clone());
                        j += 1;
                    }
                }
                merged.extend_from_slice(&left[i..]);
                merged.extend_from_slice(&right[j..]);
            }
            items = merged;
            width *= 2;
        }
        Ok(Value::array(items))
    })
}

//=============================================
//            Section 3: Higher-Order
//=============================================

fn map_items<'a>(interpreter: &'a Interpreter, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        let items = array_arg("roopantor", &args, 0)?.borrow().clone();
        let callback = callable_arg("roopantor", &args, 1)?;
        let mut mapped = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let call_args = fit_args(&callback, vec![item, Value::Int(index as i64)]);
            mapped.push(interpreter.call_value(callback.clone(), call_args).await?);
        }
        Ok(Value::array(mapped))
    })
}

fn filter_items<'a>(interpreter: &'a Interpreter, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        let items = array_arg("chhanno", &args, 0)?.borrow().clone();
        let callback = callable_arg("chhanno", &args, 1)?;
        let mut kept = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let call_args = fit_args(&callback, vec![item.clone(), Value::Int(index as i64)]);
            if interpreter.call_value(callback.clone(), call_args).await?.is_truthy() {
                kept.push(item);
            }
        }
        Ok(Value::array(kept))
    })
}

/// `sonkkhep(arr, fn(acc, item, index)[, init])`. Without `init` the first
/// element seeds the accumulator.
fn reduce_items<'a>(interpreter: &'a Interpreter, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        let items = array_arg("sonkkhep", &args, 0)?.borrow().clone();
        let callback = callable_arg("sonkkhep", &args, 1)?;
        let mut iter = items.into_iter().enumerate();
        let mut accumulator = match args.get(2) {
            Some(_) => arg(&args, 2),
            None => match iter.next() {
                Some((_, first)) => first,
                None => {
                    return Err(RuntimeError::argument(
                        "sonkkhep of an empty array needs an initial value",
                    )
                    .into());
                }
            },
        };
        for (index, item) in iter {
            let call_args = fit_args(&callback, vec![accumulator, item, Value::Int(index as i64)]);
            accumulator = interpreter.call_value(callback.clone(), call_args).await?;
        }
        Ok(accumulator)
    })
}

/// Visits a snapshot, so pushes made by the callback are not visited.
fn for_each<'a>(interpreter: &'a Interpreter, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        let items = array_arg("proti", &args, 0)?.borrow().clone();
        let callback = callable_arg("proti", &args, 1)?;
        for (index, item) in items.into_iter().enumerate() {
            let call_args = fit_args(&callback, vec![item, Value::Int(index as i64)]);
            interpreter.call_value(callback.clone(), call_args).await?;
        }
        Ok(Value::Null)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    fn numbers(values: &[i64]) -> Value {
        Value::array(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn push_and_pop_mutate_in_place() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let items = numbers(&[1, 2]);
        let length = push(&interpreter, &[items.clone(), Value::Int(3)]).unwrap();
        assert_eq!(length.to_string(), "3");
        assert_eq!(items.to_string(), "[1, 2, 3]");
        let last = pop(&interpreter, &[items.clone()]).unwrap();
        assert_eq!(last.to_string(), "3");
        assert_eq!(items.to_string(), "[1, 2]");
        interpreter.shutdown();
    }

    #[test]
    fn copies_leave_source_untouched() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let items = numbers(&[1, 2, 3, 4]);
        let sliced = slice(&interpreter, &[items.clone(), Value::Int(1), Value::Int(3)]).unwrap();
        let reversed = reverse(&interpreter, &[items.clone()]).unwrap();
        assert_eq!(sliced.to_string(), "[2, 3]");
        assert_eq!(reversed.to_string(), "[4, 3, 2, 1]");
        assert_eq!(items.to_string(), "[1, 2, 3, 4]");
        interpreter.shutdown();
    }

    #[test]
    fn natural_kind_rejects_mixed_types() {
        let numbers = [Value::Int(1), Value::Float(0.5)];
        let kind = natural_kind(&numbers).unwrap();
        assert_eq!(kind, Some(NaturalKind::Number));
        assert_eq!(natural_order(NaturalKind::Number, &numbers[0], &numbers[1]), Ordering::Greater);
        assert!(natural_kind(&[Value::Int(1), Value::from("1")]).is_err());
        assert!(natural_kind(&[Value::from("a"), Value::Null]).is_err());
        assert_eq!(natural_kind(&[]).unwrap(), None);
    }

    #[test]
    fn nan_sorts_without_breaking_order() {
        let mut items: Vec<Value> = (0..60).map(|n| Value::Int((n * 37) % 60)).collect();
        items.insert(7, Value::Float(f64::NAN));
        items.insert(30, Value::Float(f64::NAN));
        let kind = natural_kind(&items).unwrap().unwrap();
        items.sort_by(|a, b| natural_order(kind, a, b));
        let numbers: Vec<f64> = items.iter().filter_map(Value::as_f64).filter(|n| !n.is_nan()).collect();
        assert!(numbers.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(numbers.len(), 60);
    }
}

//=====================================================
// End of file
//=====================================================

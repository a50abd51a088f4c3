//=====================================================
// File: builtins/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Native function registry for BanglaCode
// Objective: Install every built-in family into the global scope and share
//            argument-checking helpers between them
//=====================================================

pub mod array;
pub mod core;
pub mod env;
pub mod events;
pub mod fs;
pub mod http;
pub mod json;
pub mod map;
pub mod math;
pub mod path;
pub mod string;
pub mod timers;

use crate::interpreter::value::{AsyncNative, SyncNative};
use crate::interpreter::{Interpreter, NativeArity, NativeImpl, OrderedMap, RuntimeError, Value};
use std::cell::RefCell;
use std::rc::Rc;

//=============================================
//            Section 1: Registration
//=============================================

pub fn install(interpreter: &Interpreter) {
    core::register(interpreter);
    string::register(interpreter);
    array::register(interpreter);
    map::register(interpreter);
    math::register(interpreter);
    fs::register(interpreter);
    json::register(interpreter);
    http::register(interpreter);
    env::register(interpreter);
    path::register(interpreter);
    timers::register(interpreter);
    events::register(interpreter);
}

pub(crate) fn register_sync(interpreter: &Interpreter, name: &str, arity: NativeArity, func: SyncNative) {
    interpreter.register_builtin(name, arity, NativeImpl::Sync(func));
}

pub(crate) fn register_async(interpreter: &Interpreter, name: &str, arity: NativeArity, func: AsyncNative) {
    interpreter.register_builtin(name, arity, NativeImpl::Async(func));
}

pub(crate) const fn exact(count: usize) -> NativeArity {
    NativeArity::Exact(count)
}

pub(crate) const fn between(min: usize, max: usize) -> NativeArity {
    NativeArity::Range {
        min,
        max: Some(max),
    }
}

pub(crate) const fn at_least(min: usize) -> NativeArity {
    NativeArity::Range { min, max: None }
}

//=============================================
//            Section 2: Argument Helpers
//=============================================

fn wrong_type(name: &str, position: usize, wanted: &str, got: Option<&Value>) -> RuntimeError {
    RuntimeError::argument(format!(
        "{} expects {} as argument {}, got {}",
        name,
        wanted,
        position + 1,
        got.map(Value::type_name).unwrap_or("nothing")
    ))
}

pub(crate) fn arg(args: &[Value], position: usize) -> Value {
    args.get(position).cloned().unwrap_or(Value::Null)
}

pub(crate) fn string_arg<'a>(name: &str, args: &'a [Value], position: usize) -> Result<&'a str, RuntimeError> {
    match args.get(position) {
        Some(Value::String(text)) => Ok(text),
        other => Err(wrong_type(name, position, "a string", other)),
    }
}

/// Integers, and floats with no fractional part.
pub(crate) fn int_arg(name: &str, args: &[Value], position: usize) -> Result<i64, RuntimeError> {
    match args.get(position) {
        Some(Value::Int(n)) => Ok(*n),
        Some(Value::Float(f)) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
        other => Err(wrong_type(name, position, "an integer", other)),
    }
}

pub(crate) fn number_arg(name: &str, args: &[Value], position: usize) -> Result<f64, RuntimeError> {
    args.get(position)
        .and_then(Value::as_f64)
        .ok_or_else(|| wrong_type(name, position, "a number", args.get(position)))
}

pub(crate) fn array_arg(
    name: &str,
    args: &[Value],
    position: usize,
) -> Result<Rc<RefCell<Vec<Value>>>, RuntimeError> {
    match args.get(position) {
        Some(Value::Array(items)) => Ok(Rc::clone(items)),
        other => Err(wrong_type(name, position, "an array", other)),
    }
}

pub(crate) fn map_arg(
    name: &str,
    args: &[Value],
    position: usize,
) -> Result<Rc<RefCell<OrderedMap>>, RuntimeError> {
    match args.get(position) {
        Some(Value::Map(map)) => Ok(Rc::clone(map)),
        other => Err(wrong_type(name, position, "a map", other)),
    }
}

pub(crate) fn callable_arg(name: &str, args: &[Value], position: usize) -> Result<Value, RuntimeError> {
    match args.get(position) {
        Some(value) if value.is_callable() => Ok(value.clone()),
        other => Err(wrong_type(name, position, "a function", other)),
    }
}

/// Drops trailing arguments the callback does not declare, so `(item)`
/// callbacks work where `(item, index)` is offered.
pub(crate) fn fit_args(callback: &Value, mut args: Vec<Value>) -> Vec<Value> {
    let accepted = match callback {
        Value::Function(func) => Some(func.decl.params.len()),
        Value::Builtin(native) => match native.arity {
            NativeArity::Exact(count) => Some(count),
            NativeArity::Range { max, .. } => max,
        },
        _ => None,
    };
    if let Some(accepted) = accepted {
        args.truncate(accepted);
    }
    args
}


//=====================================================
// End of file
//=====================================================

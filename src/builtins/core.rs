//=====================================================
// File: builtins/core.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Output, input, conversion and process built-ins
// Objective: dekho, nao, lipi, sonkha, purno, dhoron, dorghyo, somoy,
//            tarikh and bahir
//=====================================================

use super::{arg, at_least, between, exact, register_sync};
use crate::interpreter::{Control, EvalResult, Interpreter, RuntimeError, Value};
use std::io::BufRead;

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "dekho", at_least(0), dekho);
    register_sync(interpreter, "nao", between(0, 1), nao);
    register_sync(interpreter, "lipi", exact(1), lipi);
    register_sync(interpreter, "sonkha", exact(1), sonkha);
    register_sync(interpreter, "purno", exact(1), purno);
    register_sync(interpreter, "dhoron", exact(1), dhoron);
    register_sync(interpreter, "dorghyo", exact(1), dorghyo);
    register_sync(interpreter, "somoy", exact(0), somoy);
    register_sync(interpreter, "tarikh", exact(0), tarikh);
    register_sync(interpreter, "bahir", between(0, 1), bahir);
}

/// Prints its arguments separated by spaces.
fn dekho(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    interpreter.print(&line);
    Ok(Value::Null)
}

/// Reads one line from stdin without its newline; `khali` at end of input.
fn nao(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    if let Some(prompt) = args.first() {
        interpreter.options().output.write_prompt(&prompt.to_string());
    }
    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(RuntimeError::from)?;
    if read == 0 {
        return Ok(Value::Null);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    Ok(Value::String(trimmed.to_string()))
}

fn lipi(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    Ok(Value::String(arg(args, 0).to_string()))
}

/// Parses a number. Integral text becomes an int, anything else numeric a
/// float.
fn sonkha(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    match arg(args, 0) {
        value @ (Value::Int(_) | Value::Float(_)) => Ok(value),
        Value::Bool(b) => Ok(Value::Int(b as i64)),
        Value::String(text) => parse_number(&text).ok_or_else(|| {
            RuntimeError::argument(format!("sonkha cannot convert \"{}\" to a number", text)).into()
        }),
        other => Err(RuntimeError::argument(format!(
            "sonkha cannot convert {} to a number",
            other.type_name()
        ))
        .into()),
    }
}

pub(crate) fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Int(n));
    }
    text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float)
}

/// Truncates toward zero.
fn purno(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let value = match arg(args, 0) {
        Value::String(text) => parse_number(&text).ok_or_else(|| {
            RuntimeError::argument(format!("purno cannot convert \"{}\" to an integer", text))
        })?,
        other => other,
    };
    match value {
        Value::Int(n) => Ok(Value::Int(n)),
        Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Value::Bool(b) => Ok(Value::Int(b as i64)),
        other => Err(RuntimeError::argument(format!(
            "purno cannot convert {} to an integer",
            other.type_name()
        ))
        .into()),
    }
}

fn dhoron(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    Ok(Value::from(arg(args, 0).type_name()))
}

fn dorghyo(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let length = match arg(args, 0) {
        Value::String(text) => text.chars().count(),
        Value::Array(items) => items.borrow().len(),
        Value::Map(map) => map.borrow().len(),
        other => {
            return Err(RuntimeError::argument(format!(
                "dorghyo expects a string, array or map, got {}",
                other.type_name()
            ))
            .into());
        }
    };
    Ok(Value::Int(length as i64))
}

/// Milliseconds since the Unix epoch.
fn somoy(_interpreter: &Interpreter, _args: &[Value]) -> EvalResult {
    Ok(Value::Int(chrono::Utc::now().timestamp_millis()))
}

fn tarikh(_interpreter: &Interpreter, _args: &[Value]) -> EvalResult {
    let now = chrono::Local::now();
    Ok(Value::String(now.format("%Y-%m-%d %H:%M:%S").to_string()))
}

/// Ends the program with the given status. Not catchable by `chesta`.
fn bahir(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let code = match args.first() {
        None => 0,
        Some(_) => super::int_arg("bahir", args, 0)?,
    };
    let code = i32::try_from(code).unwrap_or(1);
    interpreter.request_exit(code);
    Err(Control::Exit(code))
}


//=====================================================
// End of file
//=====================================================

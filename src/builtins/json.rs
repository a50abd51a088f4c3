//=====================================================
// File: builtins/json.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: JSON encode/decode for BanglaCode values
// Objective: Map Value <-> serde_json::Value for json_banao, json_poro,
//            .json module imports and HTTP bodies
//=====================================================

use super::{between, exact, register_sync, string_arg};
use crate::interpreter::{EvalResult, Interpreter, OrderedMap, RuntimeError, Value};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "json_banao", between(1, 2), encode);
    register_sync(interpreter, "json_poro", exact(1), decode);
}

//=============================================
//            Section 1: Conversion
//=============================================

/// Converts a value into JSON. Instances encode their fields; callables,
/// promises and handles are rejected, as are cycles.
pub fn value_to_json(value: &Value) -> Result<JsonValue, RuntimeError> {
    let mut stack = Vec::new();
    to_json(value, &mut stack)
}

fn to_json(value: &Value, stack: &mut Vec<usize>) -> Result<JsonValue, RuntimeError> {
    let identity = match value {
        Value::Array(items) => Some(std::rc::Rc::as_ptr(items) as *const () as usize),
        Value::Map(map) => Some(std::rc::Rc::as_ptr(map) as *const () as usize),
        Value::Instance(instance) => Some(std::rc::Rc::as_ptr(instance) as *const () as usize),
        _ => None,
    };
    if let Some(id) = identity {
        if stack.contains(&id) {
            return Err(RuntimeError::argument("cannot encode a circular structure as JSON"));
        }
        stack.push(id);
    }

    let json = match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(n) => JsonValue::Number(Number::from(*n)),
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(text) => JsonValue::String(text.clone()),
        Value::Array(items) => {
            let items = items.borrow();
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(to_json(item, stack)?);
            }
            JsonValue::Array(out)
        }
        Value::Map(map) => entries_to_json(&map.borrow(), stack)?,
        Value::Instance(instance) => entries_to_json(&instance.fields.borrow(), stack)?,
        other => {
            return Err(RuntimeError::argument(format!(
                "cannot encode {} as JSON",
                other.type_name()
            )));
        }
    };

    if identity.is_some() {
        stack.pop();
    }
    Ok(json)
}

fn entries_to_json(map: &OrderedMap, stack: &mut Vec<usize>) -> Result<JsonValue, RuntimeError> {
    let mut object = JsonMap::new();
    for (key, item) in map.iter() {
        object.insert(key.clone(), to_json(item, stack)?);
    }
    Ok(JsonValue::Object(object))
}

pub fn json_to_value(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(text) => Value::String(text),
        JsonValue::Array(items) => Value::array(items.into_iter().map(json_to_value).collect()),
        JsonValue::Object(object) => Value::map(
            object
                .into_iter()
                .map(|(key, item)| (key, json_to_value(item)))
                .collect(),
        ),
    }
}

pub fn parse_json(text: &str) -> Result<Value, RuntimeError> {
    serde_json::from_str::<JsonValue>(text)
        .map(json_to_value)
        .map_err(|err| RuntimeError::argument(format!("invalid JSON: {}", err)))
}

//=============================================
//            Section 2: Built-ins
//=============================================

fn encode(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let json = value_to_json(&args[0])?;
    let pretty = args.get(1).is_some_and(Value::is_truthy);
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(|err| RuntimeError::argument(format!("cannot encode JSON: {}", err)))?;
    Ok(Value::String(text))
}

fn decode(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    Ok(parse_json(string_arg("json_poro", args, 0)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_order_survives_decode() {
        let value = parse_json(r#"{"zeta": 1, "alpha": [true, null, 2.5]}"#).unwrap();
        assert_eq!(value.to_string(), "{zeta: 1, alpha: [sotti, khali, 2.5]}");
    }

    #[test]
    fn encodes_nested_values() {
        let mut map = OrderedMap::new();
        map.insert("name", Value::from("Rahim"));
        map.insert("scores", Value::array(vec![Value::Int(1), Value::Float(2.5)]));
        let json = value_to_json(&Value::map(map)).unwrap();
        assert_eq!(json.to_string(), r#"{"name":"Rahim","scores":[1,2.5]}"#);
    }

    #[test]
    fn cycles_are_rejected() {
        let array = Value::array(Vec::new());
        if let Value::Array(items) = &array {
            items.borrow_mut().push(array.clone());
        }
        assert!(value_to_json(&array).is_err());
        if let Value::Array(items) = &array {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn invalid_text_reports_error() {
        assert!(parse_json("{nope").is_err());
    }
}

//=====================================================
// End of file
//=====================================================

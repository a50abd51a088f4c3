use super::{exact, map_arg, register_sync};
use crate::interpreter::{EvalResult, Interpreter, OrderedMap, Value};

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "chabi", exact(1), keys);
    register_sync(interpreter, "maan", exact(1), values);
    register_sync(interpreter, "jora", exact(1), entries);
    register_sync(interpreter, "mishao", exact(2), merge);
}

fn keys(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let map = map_arg("chabi", args, 0)?;
    let keys = map.borrow().keys().cloned().map(Value::String).collect();
    Ok(Value::array(keys))
}

fn values(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let map = map_arg("maan", args, 0)?;
    let values = map.borrow().values().cloned().collect();
    Ok(Value::array(values))
}

/// `[[key, value], ...]` in insertion order.
fn entries(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let map = map_arg("jora", args, 0)?;
    let pairs = map
        .borrow()
        .iter()
        .map(|(key, value)| Value::array(vec![Value::String(key.clone()), value.clone()]))
        .collect();
    Ok(Value::array(pairs))
}

/// New map holding `a`'s entries overwritten by `b`'s.
fn merge(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let left = map_arg("mishao", args, 0)?;
    let right = map_arg("mishao", args, 1)?;
    let mut merged: OrderedMap = left.borrow().clone();
    for (key, value) in right.borrow().iter() {
        merged.insert(key.clone(), value.clone());
    }
    Ok(Value::map(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    fn sample(pairs: &[(&str, i64)]) -> Value {
        Value::map(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), Value::Int(*value)))
                .collect(),
        )
    }

    #[test]
    fn merge_prefers_right_and_copies() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let a = sample(&[("x", 1), ("y", 2)]);
        let b = sample(&[("y", 3), ("z", 4)]);
        let merged = merge(&interpreter, &[a.clone(), b]).unwrap();
        assert_eq!(merged.to_string(), "{x: 1, y: 3, z: 4}");
        assert_eq!(a.to_string(), "{x: 1, y: 2}");
        assert_eq!(keys(&interpreter, &[merged]).unwrap().to_string(), "[\"x\", \"y\", \"z\"]");
        interpreter.shutdown();
    }
}

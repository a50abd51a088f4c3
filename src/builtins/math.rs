use super::{at_least, between, exact, int_arg, number_arg, register_sync};
use crate::interpreter::{EvalResult, Interpreter, RuntimeError, Value};
use rand::Rng;

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "borgomul", exact(1), sqrt);
    register_sync(interpreter, "ghat", exact(2), pow);
    register_sync(interpreter, "niche", exact(1), floor);
    register_sync(interpreter, "upore", exact(1), ceil);
    register_sync(interpreter, "kache", exact(1), round);
    register_sync(interpreter, "porom", exact(1), abs);
    register_sync(interpreter, "choto", at_least(1), min);
    register_sync(interpreter, "boro", at_least(1), max);
    register_sync(interpreter, "lotto", between(0, 2), random);
}

fn sqrt(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let n = number_arg("borgomul", args, 0)?;
    if n < 0.0 {
        return Err(RuntimeError::argument("borgomul of a negative number").into());
    }
    Ok(Value::Float(n.sqrt()))
}

fn pow(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    number_arg("ghat", args, 0)?;
    number_arg("ghat", args, 1)?;
    Ok(crate::interpreter::operators::binary(
        crate::ast::InfixOp::Power,
        &args[0],
        &args[1],
    )?)
}

/// Rounding keeps ints as-is and turns integral floats into ints.
fn integral(name: &str, args: &[Value], op: fn(f64) -> f64) -> EvalResult {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        _ => {
            let rounded = op(number_arg(name, args, 0)?);
            if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                Ok(Value::Int(rounded as i64))
            } else {
                Ok(Value::Float(rounded))
            }
        }
    }
}

fn floor(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    integral("niche", args, f64::floor)
}

fn ceil(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    integral("upore", args, f64::ceil)
}

fn round(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    integral("kache", args, f64::round)
}

fn abs(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    match &args[0] {
        Value::Int(n) => Ok(n
            .checked_abs()
            .map(Value::Int)
            .unwrap_or(Value::Float((*n as f64).abs()))),
        _ => Ok(Value::Float(number_arg("porom", args, 0)?.abs())),
    }
}

/// Accepts either several numbers or a single array of numbers.
fn extreme(name: &str, args: &[Value], want_max: bool) -> EvalResult {
    let values: Vec<Value> = match args {
        [Value::Array(items)] => items.borrow().clone(),
        _ => args.to_vec(),
    };
    let mut best: Option<Value> = None;
    for (idx, value) in values.iter().enumerate() {
        let n = value.as_f64().ok_or_else(|| {
            RuntimeError::argument(format!(
                "{} expects numbers, got {} at position {}",
                name,
                value.type_name(),
                idx + 1
            ))
        })?;
        let replace = match best.as_ref().and_then(Value::as_f64) {
            None => true,
            Some(current) if want_max => n > current,
            Some(current) => n < current,
        };
        if replace {
            best = Some(value.clone());
        }
    }
    best.ok_or_else(|| RuntimeError::argument(format!("{} of an empty list", name)).into())
}

fn min(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    extreme("choto", args, false)
}

fn max(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    extreme("boro", args, true)
}

/// `lotto()` is a float in [0, 1); `lotto(max)` an int in [0, max];
/// `lotto(min, max)` an int in [min, max].
fn random(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let mut rng = rand::thread_rng();
    let (low, high) = match args.len() {
        0 => return Ok(Value::Float(rng.r#gen::<f64>())),
        1 => (0, int_arg("lotto", args, 0)?),
        _ => (int_arg("lotto", args, 0)?, int_arg("lotto", args, 1)?),
    };
    if low > high {
        return Err(RuntimeError::argument(format!("lotto range {}..{} is empty", low, high)).into());
    }
    Ok(Value::Int(rng.gen_range(low..=high)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    #[test]
    fn rounding_family() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        assert_eq!(floor(&interpreter, &[Value::Float(2.7)]).unwrap().to_string(), "2");
        assert_eq!(ceil(&interpreter, &[Value::Float(2.1)]).unwrap().to_string(), "3");
        assert_eq!(round(&interpreter, &[Value::Float(-2.5)]).unwrap().to_string(), "-3");
        assert_eq!(abs(&interpreter, &[Value::Int(-4)]).unwrap().to_string(), "4");
        assert_eq!(sqrt(&interpreter, &[Value::Int(16)]).unwrap().to_string(), "4");
        assert_eq!(
            pow(&interpreter, &[Value::Int(2), Value::Int(8)]).unwrap().to_string(),
            "256"
        );
        interpreter.shutdown();
    }

    #[test]
    fn extremes_accept_lists() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let list = Value::array(vec![Value::Int(4), Value::Float(9.5), Value::Int(-1)]);
        assert_eq!(max(&interpreter, &[list.clone()]).unwrap().to_string(), "9.5");
        assert_eq!(min(&interpreter, &[list]).unwrap().to_string(), "-1");
        assert!(min(&interpreter, &[Value::from("x")]).is_err());
        interpreter.shutdown();
    }

    #[test]
    fn random_stays_in_range() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        for _ in 0..50 {
            match random(&interpreter, &[Value::Int(3), Value::Int(5)]).unwrap() {
                Value::Int(n) => assert!((3..=5).contains(&n)),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(random(&interpreter, &[Value::Int(5), Value::Int(1)]).is_err());
        interpreter.shutdown();
    }
}

use super::{between, exact, int_arg, register_sync, string_arg};
use crate::interpreter::{EvalResult, Interpreter, RuntimeError, Value};

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "boroHater", exact(1), upper);
    register_sync(interpreter, "chotoHater", exact(1), lower);
    register_sync(interpreter, "angsho", between(2, 3), substring);
    register_sync(interpreter, "khojo", exact(2), index_of);
    register_sync(interpreter, "bodlo", exact(3), replace);
    register_sync(interpreter, "chhanto", exact(1), trim);
    register_sync(interpreter, "bhag", exact(2), split);
    register_sync(interpreter, "shuruHoy", exact(2), starts_with);
    register_sync(interpreter, "sheshHoy", exact(2), ends_with);
}

fn upper(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    Ok(Value::String(string_arg("boroHater", args, 0)?.to_uppercase()))
}

fn lower(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    Ok(Value::String(string_arg("chotoHater", args, 0)?.to_lowercase()))
}

/// Clamps a character offset into `0..=length`; negative offsets count from
/// the end.
pub(crate) fn clamp_offset(offset: i64, length: usize) -> usize {
    let length = length as i64;
    let offset = if offset < 0 { length + offset } else { offset };
    offset.clamp(0, length) as usize
}

/// `angsho(s, start[, end])` by character offsets.
fn substring(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let text = string_arg("angsho", args, 0)?;
    let length = text.chars().count();
    let start = clamp_offset(int_arg("angsho", args, 1)?, length);
    let end = match args.get(2) {
        Some(_) => clamp_offset(int_arg("angsho", args, 2)?, length),
        None => length,
    };
    if start >= end {
        return Ok(Value::from(""));
    }
    Ok(Value::String(text.chars().skip(start).take(end - start).collect()))
}

/// Character index of the first match in a string, or element index in an
/// array; -1 when absent.
fn index_of(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let found = match (&args[0], &args[1]) {
        (Value::String(text), Value::String(needle)) => text
            .find(needle.as_str())
            .map(|byte| text[..byte].chars().count()),
        (Value::Array(items), needle) => items.borrow().iter().position(|item| item.equals(needle)),
        (Value::String(_), other) => {
            return Err(RuntimeError::argument(format!(
                "khojo cannot search a string for {}",
                other.type_name()
            ))
            .into());
        }
        (other, _) => {
            return Err(RuntimeError::argument(format!(
                "khojo expects a string or array, got {}",
                other.type_name()
            ))
            .into());
        }
    };
    Ok(Value::Int(found.map_or(-1, |idx| idx as i64)))
}

/// Replaces every occurrence.
fn replace(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let text = string_arg("bodlo", args, 0)?;
    let from = string_arg("bodlo", args, 1)?;
    let to = string_arg("bodlo", args, 2)?;
    if from.is_empty() {
        return Ok(Value::from(text));
    }
    Ok(Value::String(text.replace(from, to)))
}

fn trim(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    Ok(Value::from(string_arg("chhanto", args, 0)?.trim()))
}

/// An empty separator splits into characters.
fn split(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let text = string_arg("bhag", args, 0)?;
    let separator = string_arg("bhag", args, 1)?;
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator).map(Value::from).collect()
    };
    Ok(Value::array(parts))
}

fn starts_with(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let text = string_arg("shuruHoy", args, 0)?;
    Ok(Value::Bool(text.starts_with(string_arg("shuruHoy", args, 1)?)))
}

fn ends_with(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let text = string_arg("sheshHoy", args, 0)?;
    Ok(Value::Bool(text.ends_with(string_arg("sheshHoy", args, 1)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    fn call(func: fn(&Interpreter, &[Value]) -> EvalResult, args: Vec<Value>) -> Value {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let result = func(&interpreter, &args).unwrap_or_else(|_| panic!("builtin failed"));
        interpreter.shutdown();
        result
    }

    #[test]
    fn substring_uses_characters() {
        let text = Value::from("বাংলা code");
        assert_eq!(call(substring, vec![text.clone(), Value::Int(6)]).to_string(), "code");
        assert_eq!(
            call(substring, vec![Value::from("hello"), Value::Int(1), Value::Int(3)]).to_string(),
            "el"
        );
        assert_eq!(
            call(substring, vec![Value::from("hello"), Value::Int(-3)]).to_string(),
            "llo"
        );
    }

    #[test]
    fn search_and_replace() {
        assert_eq!(
            call(index_of, vec![Value::from("banana"), Value::from("na")]).to_string(),
            "2"
        );
        assert_eq!(
            call(index_of, vec![Value::from("banana"), Value::from("x")]).to_string(),
            "-1"
        );
        assert_eq!(
            call(replace, vec![Value::from("a-b-c"), Value::from("-"), Value::from("+")]).to_string(),
            "a+b+c"
        );
    }

    #[test]
    fn split_and_trim() {
        let parts = call(split, vec![Value::from("a,b,,c"), Value::from(",")]);
        assert_eq!(parts.to_string(), "[\"a\", \"b\", \"\", \"c\"]");
        assert_eq!(call(trim, vec![Value::from("  hi \n")]).to_string(), "hi");
    }
}

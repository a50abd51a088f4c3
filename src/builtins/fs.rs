use super::{exact, register_sync, string_arg};
use crate::interpreter::{EvalResult, Interpreter, RuntimeError, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "poro", exact(1), read_file);
    register_sync(interpreter, "lekho", exact(2), write_file);
    register_sync(interpreter, "jog_koro", exact(2), append_file);
    register_sync(interpreter, "file_ache", exact(1), exists);
    register_sync(interpreter, "muchhe_felo", exact(1), remove);
    register_sync(interpreter, "folder_banao", exact(1), create_dir);
    register_sync(interpreter, "folder_talika", exact(1), list_dir);
}

fn io_error(action: &str, path: &str, err: std::io::Error) -> RuntimeError {
    RuntimeError::Io(format!("{} '{}': {}", action, path, err))
}

fn read_file(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = string_arg("poro", args, 0)?;
    let text = fs::read_to_string(path).map_err(|err| io_error("cannot read", path, err))?;
    Ok(Value::String(text))
}

/// Non-string content is written in its `lipi` form.
fn write_file(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = string_arg("lekho", args, 0)?;
    fs::write(path, args[1].to_string()).map_err(|err| io_error("cannot write", path, err))?;
    debug!(path, "file written");
    Ok(Value::Bool(true))
}

fn append_file(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = string_arg("jog_koro", args, 0)?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| io_error("cannot open", path, err))?;
    file.write_all(args[1].to_string().as_bytes())
        .map_err(|err| io_error("cannot append to", path, err))?;
    Ok(Value::Bool(true))
}

fn exists(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = string_arg("file_ache", args, 0)?;
    Ok(Value::Bool(Path::new(path).exists()))
}

/// Deletes a file or a whole directory tree.
fn remove(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = string_arg("muchhe_felo", args, 0)?;
    let target = Path::new(path);
    let result = if target.is_dir() {
        fs::remove_dir_all(target)
    } else {
        fs::remove_file(target)
    };
    result.map_err(|err| io_error("cannot delete", path, err))?;
    Ok(Value::Bool(true))
}

fn create_dir(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = string_arg("folder_banao", args, 0)?;
    fs::create_dir_all(path).map_err(|err| io_error("cannot create", path, err))?;
    Ok(Value::Bool(true))
}

/// Entry names, sorted.
fn list_dir(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = string_arg("folder_talika", args, 0)?;
    let entries = fs::read_dir(path).map_err(|err| io_error("cannot list", path, err))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| io_error("cannot list", path, err))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(Value::array(names.into_iter().map(Value::String).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    #[test]
    fn write_append_read_list_delete() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        let nested_str = nested.to_string_lossy().to_string();
        create_dir(&interpreter, &[Value::from(nested_str.as_str())]).unwrap();

        let file = nested.join("notes.txt").to_string_lossy().to_string();
        write_file(&interpreter, &[Value::from(file.as_str()), Value::from("ek")]).unwrap();
        append_file(&interpreter, &[Value::from(file.as_str()), Value::Int(2)]).unwrap();
        let text = read_file(&interpreter, &[Value::from(file.as_str())]).unwrap();
        assert_eq!(text.to_string(), "ek2");

        let listing = list_dir(&interpreter, &[Value::from(nested_str.as_str())]).unwrap();
        assert_eq!(listing.to_string(), "[\"notes.txt\"]");

        remove(&interpreter, &[Value::from(nested_str.as_str())]).unwrap();
        let gone = exists(&interpreter, &[Value::from(file.as_str())]).unwrap();
        assert!(!gone.is_truthy());
        interpreter.shutdown();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let err = read_file(&interpreter, &[Value::from("/definitely/not/here.txt")]).unwrap_err();
        match err {
            crate::interpreter::Control::Throw(thrown) => {
                assert!(matches!(thrown.error, Some(RuntimeError::Io(_))))
            }
            other => panic!("unexpected {other:?}"),
        }
        interpreter.shutdown();
    }
}

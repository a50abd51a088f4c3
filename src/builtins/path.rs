use super::{at_least, exact, register_sync, string_arg};
use crate::interpreter::{EvalResult, Interpreter, RuntimeError, Value};
use std::path::{Component, Path, PathBuf};

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "path_joro", at_least(1), join);
    register_sync(interpreter, "path_naam", exact(1), file_name);
    register_sync(interpreter, "path_folder", exact(1), parent);
    register_sync(interpreter, "path_ext", exact(1), extension);
    register_sync(interpreter, "path_purno", exact(1), absolute);
    register_sync(interpreter, "path_bari", exact(0), home);
}

fn text(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

fn join(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let mut joined = PathBuf::new();
    for idx in 0..args.len() {
        joined.push(string_arg("path_joro", args, idx)?);
    }
    Ok(text(&joined))
}

fn file_name(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = Path::new(string_arg("path_naam", args, 0)?);
    Ok(path
        .file_name()
        .map_or_else(|| Value::from(""), |name| Value::String(name.to_string_lossy().into_owned())))
}

/// `"."` for a bare file name.
fn parent(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = Path::new(string_arg("path_folder", args, 0)?);
    Ok(match path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Value::from("."),
        Some(dir) => text(dir),
        None => text(path),
    })
}

/// Extension with its leading dot, or `""`.
fn extension(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = Path::new(string_arg("path_ext", args, 0)?);
    Ok(Value::String(
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default(),
    ))
}

/// Absolute, lexically normalised form; the file need not exist.
fn absolute(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = Path::new(string_arg("path_purno", args, 0)?);
    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir()
            .map_err(|err| RuntimeError::Io(format!("cannot read current directory: {}", err)))?
    };
    let mut normalised = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalised.pop();
            }
            other => normalised.push(other.as_os_str()),
        }
    }
    Ok(text(&normalised))
}

fn home(_interpreter: &Interpreter, _args: &[Value]) -> EvalResult {
    dirs::home_dir()
        .map(|dir| text(&dir))
        .ok_or_else(|| RuntimeError::Io("home directory is unknown".into()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    fn call(func: fn(&Interpreter, &[Value]) -> EvalResult, args: &[&str]) -> String {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let args: Vec<Value> = args.iter().map(|arg| Value::from(*arg)).collect();
        let out = func(&interpreter, &args).unwrap().to_string();
        interpreter.shutdown();
        out
    }

    #[test]
    fn components() {
        assert_eq!(call(join, &["data", "users", "list.json"]), "data/users/list.json");
        assert_eq!(call(file_name, &["data/users/list.json"]), "list.json");
        assert_eq!(call(parent, &["data/users/list.json"]), "data/users");
        assert_eq!(call(parent, &["list.json"]), ".");
        assert_eq!(call(extension, &["data/list.json"]), ".json");
        assert_eq!(call(extension, &["Makefile"]), "");
    }

    #[test]
    fn absolute_paths_are_normalised() {
        assert_eq!(call(absolute, &["/srv/app/./lib/../main.bang"]), "/srv/app/main.bang");
        assert!(call(absolute, &["main.bang"]).starts_with('/'));
    }
}

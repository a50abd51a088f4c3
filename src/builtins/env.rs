//=====================================================
// File: builtins/env.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Environment variable built-ins
// Objective: Load .env files into an interpreter-owned overlay and read it
//            ahead of the process environment
//=====================================================

use super::{between, exact, register_sync, string_arg};
use crate::interpreter::{EvalResult, Interpreter, OrderedMap, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const PROFILE_ENV: &str = "BANGLACODE_ENV";
const DEFAULT_PROFILE: &str = "development";

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "env_load", between(0, 1), load);
    register_sync(interpreter, "env_load_auto", between(0, 1), load_auto);
    register_sync(interpreter, "env_get", exact(1), get);
    register_sync(interpreter, "env_get_default", exact(2), get_default);
    register_sync(interpreter, "env_set", exact(2), set);
    register_sync(interpreter, "env_all", exact(0), all);
    register_sync(interpreter, "env_clear", exact(0), clear);
}

//=============================================
//            Section 1: Overlay Store
//=============================================

/// Variables loaded or set by the script. Lookups consult this first and
/// then the process environment; the process environment is never written.
#[derive(Debug, Default)]
pub struct EnvStore {
    vars: BTreeMap<String, String>,
}

impl EnvStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn extend(&mut self, vars: Vec<(String, String)>) -> usize {
        let count = vars.len();
        self.vars.extend(vars);
        count
    }

    /// Process variables overlaid with script-set ones, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = std::env::vars().collect();
        merged.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

//=============================================
//            Section 2: Dotenv Parsing
//=============================================

/// Parses `KEY=VALUE` lines. Blank lines and `#` comments are skipped, an
/// `export ` prefix is ignored, and quotes are stripped. Escapes apply inside
/// double quotes only.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map_or(line, str::trim_start);
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.push((key.to_string(), unquote(raw.trim())));
    }
    vars
}

fn unquote(raw: &str) -> String {
    let quoted = |q: char| raw.len() >= 2 && raw.starts_with(q) && raw.ends_with(q);
    if quoted('"') {
        raw[1..raw.len() - 1]
            .replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\\"", "\"")
    } else if quoted('\'') {
        raw[1..raw.len() - 1].to_string()
    } else {
        // Unquoted values may carry a trailing comment.
        match raw.find(" #") {
            Some(idx) => raw[..idx].trim_end().to_string(),
            None => raw.to_string(),
        }
    }
}

/// Reads one file into the store. A missing file is not an error.
fn load_file(interpreter: &Interpreter, path: &Path) -> bool {
    match fs::read_to_string(path) {
        Ok(content) => {
            let count = interpreter.env_store().borrow_mut().extend(parse_dotenv(&content));
            info!(path = %path.display(), count, "env file loaded");
            true
        }
        Err(err) => {
            debug!(path = %path.display(), error = %err, "env file skipped");
            false
        }
    }
}

//=============================================
//            Section 3: Built-ins
//=============================================

fn load(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let path = match args.first() {
        Some(_) => string_arg("env_load", args, 0)?,
        None => ".env",
    };
    Ok(Value::Bool(load_file(interpreter, Path::new(path))))
}

/// Loads `.env` and then `.env.<profile>`; the profile comes from the
/// argument, then `BANGLACODE_ENV`, then `development`.
fn load_auto(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let profile = match args.first() {
        Some(_) => string_arg("env_load_auto", args, 0)?.to_string(),
        None => std::env::var(PROFILE_ENV).unwrap_or_else(|_| DEFAULT_PROFILE.to_string()),
    };
    let base = load_file(interpreter, Path::new(".env"));
    let specific = load_file(interpreter, Path::new(&format!(".env.{}", profile)));
    Ok(Value::Bool(base || specific))
}

fn get(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let key = string_arg("env_get", args, 0)?;
    Ok(interpreter
        .env_store()
        .borrow()
        .get(key)
        .map_or(Value::Null, Value::String))
}

fn get_default(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let key = string_arg("env_get_default", args, 0)?;
    let found = interpreter.env_store().borrow().get(key);
    Ok(found.map_or_else(|| args[1].clone(), Value::String))
}

fn set(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let key = string_arg("env_set", args, 0)?;
    interpreter
        .env_store()
        .borrow_mut()
        .set(key, args[1].to_string());
    Ok(Value::Null)
}

fn all(interpreter: &Interpreter, _args: &[Value]) -> EvalResult {
    let map: OrderedMap = interpreter
        .env_store()
        .borrow()
        .snapshot()
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Ok(Value::map(map))
}

/// Forgets script-set and loaded variables.
fn clear(interpreter: &Interpreter, _args: &[Value]) -> EvalResult {
    interpreter.env_store().borrow_mut().clear();
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    #[test]
    fn parses_comments_exports_and_quotes() {
        let vars = parse_dotenv(
            "# config\n\nexport PORT=8080\nNAME=\"Bangla\\nCode\"\nRAW='a\\nb'\nMODE=dev # local\nbroken\n",
        );
        assert_eq!(
            vars,
            vec![
                ("PORT".to_string(), "8080".to_string()),
                ("NAME".to_string(), "Bangla\nCode".to_string()),
                ("RAW".to_string(), "a\\nb".to_string()),
                ("MODE".to_string(), "dev".to_string()),
            ]
        );
    }

    #[test]
    fn overlay_shadows_and_clears() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let key = Value::from("BANGLACODE_TEST_OVERLAY_KEY");
        assert!(matches!(get(&interpreter, &[key.clone()]).unwrap(), Value::Null));
        set(&interpreter, &[key.clone(), Value::Int(42)]).unwrap();
        assert_eq!(get(&interpreter, &[key.clone()]).unwrap().to_string(), "42");
        assert!(std::env::var("BANGLACODE_TEST_OVERLAY_KEY").is_err());
        clear(&interpreter, &[]).unwrap();
        let fallback = get_default(&interpreter, &[key, Value::from("none")]).unwrap();
        assert_eq!(fallback.to_string(), "none");
        interpreter.shutdown();
    }

    #[test]
    fn loads_file_from_disk() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.env");
        std::fs::write(&file, "BANGLACODE_TEST_LOADED=yes\n").unwrap();
        let loaded = load(&interpreter, &[Value::from(&*file.to_string_lossy())]).unwrap();
        assert!(loaded.is_truthy());
        assert_eq!(
            interpreter.env_store().borrow().get("BANGLACODE_TEST_LOADED"),
            Some("yes".to_string())
        );
        let missing = load(&interpreter, &[Value::from("/no/such/.env")]).unwrap();
        assert!(!missing.is_truthy());
        interpreter.shutdown();
    }
}

//=====================================================
// End of file
//=====================================================

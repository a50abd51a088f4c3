//=====================================================
// File: modules/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Module resolution and caching for `ano` imports
// Objective: Resolve import paths against the importing file, read and parse
//            .bang and .json modules, and cache exports by canonical path
//=====================================================

//=============================================
//            Section 1: Imports & Errors
//=============================================

use crate::ast::Program;
use crate::builtins::json::json_to_value;
use crate::interpreter::{RuntimeError, Value};
use crate::parser::{ParseError, parse_source};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

pub const SOURCE_EXTENSION: &str = "bang";
const DIRECTORY_ENTRY: &str = "mod.bang";

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module '{spec}' could not be found from {}", base.display())]
    NotFound { spec: String, base: PathBuf },
    #[error("failed reading module '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse error in module '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("invalid JSON in module '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ModuleError> for RuntimeError {
    fn from(value: ModuleError) -> Self {
        RuntimeError::Module(value.to_string())
    }
}

//=============================================
//            Section 2: Cache
//=============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleStatus {
    Initializing,
    Ready,
}

struct ModuleCacheEntry {
    exports: Value,
    status: ModuleStatus,
}

/// Exports keyed by canonical path. An entry is registered before the module
/// body runs, so a cyclic importer sees the exports defined so far.
#[derive(Default)]
pub struct ModuleLoader {
    cache: HashMap<PathBuf, ModuleCacheEntry>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    //Function: resolve
    //Purpose: Map an import string to a canonical file path
    //Inputs: spec: &str, base: &Path (directory of the importing file)
    //Returns: Result<PathBuf, ModuleError>
    pub fn resolve(&self, spec: &str, base: &Path) -> Result<PathBuf, ModuleError> {
        let direct = PathBuf::from(spec);
        let candidate = if direct.is_absolute() {
            direct
        } else {
            base.join(spec)
        };

        let mut attempts = vec![candidate.clone()];
        if candidate.extension().is_none() {
            attempts.push(candidate.with_extension(SOURCE_EXTENSION));
        }
        attempts.push(candidate.join(DIRECTORY_ENTRY));

        for attempt in attempts {
            if attempt.is_file() {
                let canonical = attempt.canonicalize().unwrap_or(attempt);
                trace!(spec, path = %canonical.display(), "module resolved");
                return Ok(canonical);
            }
        }
        Err(ModuleError::NotFound {
            spec: spec.to_string(),
            base: base.to_path_buf(),
        })
    }

    /// Exports of a loaded or loading module.
    pub fn cached(&self, path: &Path) -> Option<Value> {
        self.cache.get(path).map(|entry| {
            if entry.status == ModuleStatus::Initializing {
                debug!(module = %path.display(), "cyclic import sees partial exports");
            }
            entry.exports.clone()
        })
    }

    pub fn register(&mut self, path: PathBuf, exports: Value, ready: bool) {
        let status = if ready {
            ModuleStatus::Ready
        } else {
            ModuleStatus::Initializing
        };
        self.cache.insert(path, ModuleCacheEntry { exports, status });
    }

    pub fn mark_ready(&mut self, path: &Path) {
        if let Some(entry) = self.cache.get_mut(path) {
            entry.status = ModuleStatus::Ready;
        }
    }

    /// Drops a module whose body failed so a later import retries it.
    pub fn forget(&mut self, path: &Path) {
        self.cache.remove(path);
    }

    pub fn is_loading(&self, path: &Path) -> bool {
        self.cache
            .get(path)
            .is_some_and(|entry| entry.status == ModuleStatus::Initializing)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

//=============================================
//            Section 3: Reading Modules
//=============================================

pub fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read_text(path: &Path) -> Result<String, ModuleError> {
    fs::read_to_string(path).map_err(|source| ModuleError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_program(path: &Path) -> Result<Program, ModuleError> {
    let source = read_text(path)?;
    parse_source(&source).map_err(|source| ModuleError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json(path: &Path) -> Result<Value, ModuleError> {
    let text = read_text(path)?;
    serde_json::from_str(&text)
        .map(json_to_value)
        .map_err(|source| ModuleError::Json {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_with_and_without_extension() {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::write(dir.path().join("math.bang"), "pathao kaj dui() { ferao 2; }").unwrap();
        fs::create_dir(dir.path().join("util")).unwrap();
        fs::write(dir.path().join("util").join("mod.bang"), "").unwrap();

        let loader = ModuleLoader::new();
        let explicit = loader.resolve("./math.bang", dir.path()).unwrap();
        let bare = loader.resolve("math", dir.path()).unwrap();
        assert_eq!(explicit, bare);
        assert!(loader.resolve("util", dir.path()).unwrap().ends_with("mod.bang"));

        let missing = loader.resolve("nope", dir.path()).unwrap_err();
        assert!(matches!(missing, ModuleError::NotFound { .. }));
        assert!(missing.to_string().contains("nope"));
    }

    #[test]
    fn cache_tracks_status_and_forgets_failures() {
        let mut loader = ModuleLoader::new();
        let path = PathBuf::from("/virtual/a.bang");
        loader.register(path.clone(), Value::Int(1), false);
        assert!(loader.is_loading(&path));
        loader.mark_ready(&path);
        assert!(!loader.is_loading(&path));
        assert!(loader.cached(&path).is_some());
        loader.forget(&path);
        assert!(loader.cached(&path).is_none());
        assert!(loader.is_empty());
    }

    #[test]
    fn json_modules_decode() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"port": 8080, "tags": ["a"]}"#).unwrap();
        assert!(is_json(&path));
        let value = read_json(&path).unwrap();
        assert_eq!(value.to_string(), "{port: 8080, tags: [\"a\"]}");

        fs::write(&path, "{oops").unwrap();
        assert!(matches!(read_json(&path), Err(ModuleError::Json { .. })));
    }

    #[test]
    fn parse_failures_name_the_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("broken.bang");
        fs::write(&path, "dhoro = ;").unwrap();
        let err = read_program(&path).unwrap_err();
        assert!(err.to_string().contains("broken.bang"));
    }
}

//=====================================================
// End of file
//=====================================================

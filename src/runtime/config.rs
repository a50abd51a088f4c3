//=====================================================
// File: runtime/config.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Layered runtime configuration
// Objective: Read banglacode.toml and BANGLACODE_* environment overrides
//            into RuntimeOptions
//=====================================================

use super::RuntimeOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "banglacode.toml";
pub const AWAIT_TIMEOUT_ENV: &str = "BANGLACODE_AWAIT_TIMEOUT_MS";
pub const MAX_DEPTH_ENV: &str = "BANGLACODE_MAX_DEPTH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `banglacode.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub runtime: RuntimeSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    pub await_timeout_ms: Option<u64>,
    pub max_call_depth: Option<usize>,
}

impl ConfigFile {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `banglacode.toml` from `dir` if one exists.
    pub fn discover(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(config = %path.display(), "loaded runtime config");
        Self::parse(&text, &path).map(Some)
    }

    pub fn apply(&self, mut options: RuntimeOptions) -> RuntimeOptions {
        if let Some(ms) = self.runtime.await_timeout_ms {
            options = options.with_await_timeout(Duration::from_millis(ms));
        }
        if let Some(depth) = self.runtime.max_call_depth {
            options = options.with_max_call_depth(depth);
        }
        options
    }
}

/// Applies `BANGLACODE_AWAIT_TIMEOUT_MS` and `BANGLACODE_MAX_DEPTH`.
/// Unparseable values are ignored with a warning.
pub fn apply_env(options: RuntimeOptions) -> RuntimeOptions {
    apply_overrides(
        options,
        std::env::var(AWAIT_TIMEOUT_ENV).ok().as_deref(),
        std::env::var(MAX_DEPTH_ENV).ok().as_deref(),
    )
}

fn apply_overrides(
    mut options: RuntimeOptions,
    timeout: Option<&str>,
    depth: Option<&str>,
) -> RuntimeOptions {
    if let Some(raw) = timeout {
        match raw.trim().parse::<u64>() {
            Ok(ms) => options = options.with_await_timeout(Duration::from_millis(ms)),
            Err(_) => warn!(variable = AWAIT_TIMEOUT_ENV, value = raw, "ignoring invalid value"),
        }
    }
    if let Some(raw) = depth {
        match raw.trim().parse::<usize>() {
            Ok(depth) => options = options.with_max_call_depth(depth),
            Err(_) => warn!(variable = MAX_DEPTH_ENV, value = raw, "ignoring invalid value"),
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_runtime_section() {
        let config = ConfigFile::parse(
            "[runtime]\nawait_timeout_ms = 250\nmax_call_depth = 64\n",
            Path::new("banglacode.toml"),
        )
        .unwrap();
        let options = config.apply(RuntimeOptions::default());
        assert_eq!(options.await_timeout, Duration::from_millis(250));
        assert_eq!(options.max_call_depth, 64);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = ConfigFile::parse("[runtime]\nturbo = true\n", Path::new("banglacode.toml"));
        assert!(matches!(err, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let config = ConfigFile::parse("", Path::new("banglacode.toml")).unwrap();
        let options = config.apply(RuntimeOptions::default());
        assert_eq!(options.await_timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_skip_garbage() {
        let options = apply_overrides(RuntimeOptions::default(), Some("75"), Some("lots"));
        assert_eq!(options.await_timeout, Duration::from_millis(75));
        assert_eq!(options.max_call_depth, 1000);
    }

    #[test]
    fn discover_reads_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigFile::discover(dir.path()).unwrap().is_none());
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[runtime]\nmax_call_depth = 10\n").unwrap();
        let config = ConfigFile::discover(dir.path()).unwrap().unwrap();
        assert_eq!(config.runtime.max_call_depth, Some(10));
    }
}

//=====================================================
// End of file
//=====================================================

//=====================================================
// File: runtime/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Execution driver for BanglaCode programs
// Objective: Own the tokio current-thread runtime and LocalSet, run a
//            program to completion, drain background tasks and map the
//            outcome to an exit code or a ScriptError
//=====================================================

//=============================================
//            Section 1: Modules & Imports
//=============================================

pub mod async_control;
pub mod config;
pub mod promise;

use crate::ast::{Program, Stmt};
use crate::interpreter::{
    Control, Env, ErrorCode, Interpreter, OrderedMap, ScriptError, Value,
};
use crate::parser::parse_source;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::LocalSet;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub use config::{ConfigError, ConfigFile};

//=============================================
//            Section 2: Options
//=============================================

/// Where `dekho` writes.
#[derive(Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    Capture(Arc<Mutex<String>>),
}

impl OutputSink {
    /// A sink that records output in memory, plus a handle to read it back.
    pub fn capture() -> (Self, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        (OutputSink::Capture(Arc::clone(&buffer)), buffer)
    }

    pub fn write_line(&self, line: &str) {
        match self {
            OutputSink::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                // a closed stdout is not a script error
                let _ = writeln!(handle, "{}", line);
            }
            OutputSink::Capture(buffer) => {
                let mut buffer = buffer.lock();
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
    }

    pub fn write_prompt(&self, text: &str) {
        match self {
            OutputSink::Stdout => {
                let mut stdout = std::io::stdout();
                let _ = write!(stdout, "{}", text);
                let _ = stdout.flush();
            }
            OutputSink::Capture(buffer) => buffer.lock().push_str(text),
        }
    }
}

#[derive(Clone)]
pub struct RuntimeOptions {
    /// Bound on every `opekha`.
    pub await_timeout: Duration,
    pub max_call_depth: usize,
    pub output: OutputSink,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            await_timeout: Duration::from_secs(30),
            max_call_depth: 1000,
            output: OutputSink::Stdout,
        }
    }
}

impl RuntimeOptions {
    pub fn with_await_timeout(mut self, timeout: Duration) -> Self {
        self.await_timeout = timeout;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    //Function: discover
    //Purpose: Layer banglacode.toml (from `script_dir`) and environment
    //         overrides over the defaults
    //Inputs: script_dir: Option<&Path>
    //Returns: Result<RuntimeOptions, ConfigError>
    pub fn discover(script_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        if let Some(dir) = script_dir
            && let Some(file) = ConfigFile::discover(dir)?
        {
            options = file.apply(options);
        }
        Ok(config::apply_env(options))
    }
}

//=============================================
//            Section 3: Logging
//=============================================

static LOGGING: OnceLock<()> = OnceLock::new();

/// Installs the global tracing subscriber once. `BANGLACODE_LOG` takes an
/// `EnvFilter` directive; otherwise the level is `warn` (`debug` if verbose).
pub fn init_logging(verbose: bool) {
    LOGGING.get_or_init(|| {
        let fallback = if verbose { "debug" } else { "warn" };
        let filter = EnvFilter::try_from_env("BANGLACODE_LOG")
            .unwrap_or_else(|_| EnvFilter::new(fallback));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

//=============================================
//            Section 4: Driver
//=============================================

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub value: Value,
    pub exit_code: i32,
}

/// One interpreter plus the executor it runs on. Dropping the runtime
/// releases every scope the program created.
pub struct Runtime {
    interpreter: Interpreter,
    local: LocalSet,
    executor: tokio::runtime::Runtime,
    session: RefCell<Option<Env>>,
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Result<Self, ScriptError> {
        let executor = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                ScriptError::new(ErrorCode::RuntimePanic, format!("tokio runtime init failed: {err}"))
            })?;
        Ok(Self {
            interpreter: Interpreter::new(options),
            local: LocalSet::new(),
            executor,
            session: RefCell::new(None),
        })
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Parses and runs `source`; `path` names the file for diagnostics and
    /// relative imports.
    pub fn run_source(&self, source: &str, path: Option<&Path>) -> Result<RunOutcome, ScriptError> {
        let program = parse_source(source).map_err(|err| attach_file(ScriptError::from(err), path))?;
        self.run_program(&program, path)
    }

    pub fn run_file(&self, path: &Path) -> Result<RunOutcome, ScriptError> {
        let source = std::fs::read_to_string(path).map_err(|err| {
            ScriptError::new(ErrorCode::ModuleResolution, format!("cannot read script: {err}"))
                .with_file(path)
        })?;
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        info!(script = %path.display(), "running script");
        self.run_source(&source, Some(&path))
    }

    pub fn run_program(&self, program: &Program, path: Option<&Path>) -> Result<RunOutcome, ScriptError> {
        let exports = Rc::new(RefCell::new(OrderedMap::new()));
        let env = self.interpreter.module_env(path.map(Path::to_path_buf), exports);
        self.execute(&program.statements, &env)
            .map_err(|err| attach_file(err, path))
    }

    /// Runs one REPL entry in a scope that persists across calls.
    pub fn eval_session(&self, source: &str) -> Result<RunOutcome, ScriptError> {
        let program = parse_source(source)?;
        let env = self
            .session
            .borrow_mut()
            .get_or_insert_with(|| {
                let exports = Rc::new(RefCell::new(OrderedMap::new()));
                let cwd = std::env::current_dir().ok().map(|dir| dir.join("<repl>"));
                self.interpreter.module_env(cwd, exports)
            })
            .clone();
        self.execute(&program.statements, &env)
    }

    fn execute(&self, statements: &[Stmt], env: &Env) -> Result<RunOutcome, ScriptError> {
        let interpreter = &self.interpreter;
        self.local.block_on(&self.executor, async {
            let value = match interpreter.exec_program(statements, env).await {
                Ok(value) | Err(Control::Return(value)) => value,
                Err(Control::Exit(code)) => {
                    debug!(code, "exit requested");
                    return Ok(RunOutcome {
                        value: Value::Null,
                        exit_code: code,
                    });
                }
                Err(Control::Throw(thrown)) => return Err(ScriptError::from_thrown(&thrown)),
                Err(Control::Break | Control::Continue) => Value::Null,
            };
            let exit_code = interpreter.drain_tasks().await;
            Ok(RunOutcome { value, exit_code })
        })
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.session.borrow_mut().take();
        self.interpreter.shutdown();
    }
}

fn attach_file(err: ScriptError, path: Option<&Path>) -> ScriptError {
    match path {
        Some(path) => err.with_file(path),
        None => err,
    }
}

//=============================================
//            Section 5: Convenience Entry Points
//=============================================

/// Runs `source` on a fresh runtime.
pub fn run_source(source: &str, options: RuntimeOptions) -> Result<RunOutcome, ScriptError> {
    Runtime::new(options)?.run_source(source, None)
}

/// Runs the script at `path` on a fresh runtime.
pub fn run_file(path: impl Into<PathBuf>, options: RuntimeOptions) -> Result<RunOutcome, ScriptError> {
    let path = path.into();
    Runtime::new(options)?.run_file(&path)
}

//=============================================/*
//  The driver blocks on a LocalSet so async bodies, timers and servers
//  share one thread with the evaluator. After the main program finishes,
//  drain_tasks keeps the executor turning until tracked work is done.
//============================================*/


//=====================================================
// End of file
//=====================================================

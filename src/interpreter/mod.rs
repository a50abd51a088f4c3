//=====================================================
// File: interpreter/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tree-walking interpreter for BanglaCode
// Objective: Own program-wide state (globals, module cache, task tracker,
//            options) and expose the evaluation entry points
//=====================================================

//=============================================
//            Section 1: Modules & Imports
//=============================================

pub mod environment;
pub mod errors;
mod expressions;
pub mod generator;
pub mod operators;
mod statements;
pub mod value;

pub use environment::{Env, Environment, ModuleScope, Scope};
pub(crate) use expressions::contains;
pub use errors::{Control, ErrorCode, EvalResult, RuntimeError, ScriptError, Thrown};
pub use value::{
    Class, Function, Handle, Instance, LocalBoxFuture, NativeArity, NativeFunction, NativeImpl,
    OrderedMap, Value,
};

use crate::ast::{FunctionBody, Stmt};
use crate::builtins::{self, env::EnvStore};
use crate::modules::ModuleLoader;
use crate::runtime::RuntimeOptions;
use crate::runtime::async_control::AsyncControl;
use crate::runtime::promise::Promise;
use generator::{Generator, Yielder};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

//=============================================/*
//  Submodules split evaluation by concern: statements, expressions,
//  operators and generators.
//============================================*/
//=============================================
//            Section 2: Interpreter State
//=============================================

struct InterpreterState {
    globals: Env,
    options: RuntimeOptions,
    modules: RefCell<ModuleLoader>,
    tasks: Rc<AsyncControl>,
    captured_scopes: RefCell<Vec<Weak<Environment>>>,
    instances: RefCell<Vec<Weak<Instance>>>,
    env_store: RefCell<EnvStore>,
    http: ureq::Agent,
    exit_code: Cell<Option<i32>>,
}

/// Cheap-to-clone handle over the program-wide interpreter state. All clones
/// share one global scope, module cache and task tracker.
#[derive(Clone)]
pub struct Interpreter {
    state: Rc<InterpreterState>,
}

tokio::task_local! {
    /// Frames on the current logical call chain. Each spawned task (an async
    /// call or a generator body) starts its own chain.
    static CALL_DEPTH: Cell<usize>;
}

/// Decrements the call depth when a call frame ends, even if its future is dropped.
struct DepthGuard;

impl Drop for DepthGuard {
    fn drop(&mut self) {
        let _ = CALL_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Depth of the call chain the current future belongs to.
fn call_depth() -> usize {
    CALL_DEPTH.try_with(Cell::get).unwrap_or(0)
}

impl Interpreter {
    //Function: new
    //Purpose: Build a fresh interpreter with every built-in installed
    //Inputs: options: RuntimeOptions
    //Returns: Interpreter
    pub fn new(options: RuntimeOptions) -> Self {
        let http = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        let interpreter = Self {
            state: Rc::new(InterpreterState {
                globals: Environment::new_global(),
                options,
                modules: RefCell::new(ModuleLoader::new()),
                tasks: Rc::new(AsyncControl::new()),
                captured_scopes: RefCell::new(Vec::new()),
                instances: RefCell::new(Vec::new()),
                env_store: RefCell::new(EnvStore::default()),
                http,
                exit_code: Cell::new(None),
            }),
        };
        builtins::install(&interpreter);
        interpreter
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.state.options
    }

    pub fn globals(&self) -> &Env {
        &self.state.globals
    }

    pub(crate) fn modules(&self) -> &RefCell<ModuleLoader> {
        &self.state.modules
    }

    pub(crate) fn env_store(&self) -> &RefCell<EnvStore> {
        &self.state.env_store
    }

    pub(crate) fn http_agent(&self) -> &ureq::Agent {
        &self.state.http
    }

    pub fn tasks(&self) -> &AsyncControl {
        &self.state.tasks
    }

    /// Registers a native function in the global scope.
    pub fn register_builtin(&self, name: &str, arity: NativeArity, imp: NativeImpl) {
        let native = NativeFunction {
            name: name.to_string(),
            arity,
            imp,
        };
        // global scope has no constants at install time
        let _ = self
            .state
            .globals
            .define(name, Value::Builtin(Rc::new(native)));
    }

    /// Writes one line of script output.
    pub fn print(&self, line: &str) {
        self.state.options.output.write_line(line);
    }

    /// Creates the root scope of a module or main program.
    pub fn module_env(&self, path: Option<PathBuf>, exports: Rc<RefCell<OrderedMap>>) -> Env {
        let scope = Rc::new(ModuleScope::new(path, exports));
        Environment::child(&self.state.globals, Scope::Module(scope))
    }

    //=============================================
    //            Section 3: Program Entry Points
    //=============================================

    /// Runs a parsed program's statements in `env`, returning the value of the
    /// final statement.
    pub async fn exec_program(&self, statements: &[Stmt], env: &Env) -> EvalResult {
        match self.exec_block(statements, env).await {
            Err(Control::Return(value)) => Ok(value),
            other => other,
        }
    }

    /// Waits for every tracked background task to finish, or for `bahir`.
    /// Returns the requested exit code.
    pub async fn drain_tasks(&self) -> i32 {
        loop {
            if let Some(code) = self.state.exit_code.get() {
                return code;
            }
            if self.state.tasks.is_idle() {
                return 0;
            }
            trace!(pending = self.state.tasks.active(), "waiting for background tasks");
            self.state.tasks.changed().await;
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.state.exit_code.get()
    }

    pub(crate) fn request_exit(&self, code: i32) {
        if self.state.exit_code.get().is_none() {
            self.state.exit_code.set(Some(code));
        }
        self.state.tasks.notify();
    }

    /// Clears every scope a closure captured, every live instance's fields and
    /// the global scope so that closure/instance reference cycles are released.
    pub fn shutdown(&self) {
        let scopes: Vec<Weak<Environment>> =
            std::mem::take(&mut *self.state.captured_scopes.borrow_mut());
        let mut cleared = 0usize;
        for scope in scopes {
            if let Some(env) = scope.upgrade() {
                env.clear();
                cleared += 1;
            }
        }
        let instances: Vec<Weak<Instance>> =
            std::mem::take(&mut *self.state.instances.borrow_mut());
        let mut released = 0usize;
        for instance in instances {
            if let Some(instance) = instance.upgrade() {
                let fields = instance.fields.replace(OrderedMap::new());
                drop(fields);
                released += 1;
            }
        }
        self.state.modules.borrow_mut().clear();
        self.state.globals.clear();
        debug!(cleared, released, "interpreter scopes released");
    }

    pub(crate) fn register_capture(&self, env: &Env) {
        let mut scopes = self.state.captured_scopes.borrow_mut();
        if scopes
            .last()
            .is_some_and(|last| std::ptr::eq(last.as_ptr(), Rc::as_ptr(env)))
        {
            return;
        }
        if scopes.len() >= 1024 && scopes.len().is_power_of_two() {
            scopes.retain(|scope| scope.strong_count() > 0);
        }
        scopes.push(Rc::downgrade(env));
    }

    fn register_instance(&self, instance: &Rc<Instance>) {
        let mut instances = self.state.instances.borrow_mut();
        if instances.len() >= 1024 && instances.len().is_power_of_two() {
            instances.retain(|instance| instance.strong_count() > 0);
        }
        instances.push(Rc::downgrade(instance));
    }

    //=============================================
    //            Section 4: Calls
    //=============================================

    /// Calls any callable value with positional arguments.
    pub fn call_value<'a>(&'a self, callee: Value, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
        Box::pin(async move {
            match callee {
                Value::Function(func) => self.call_function(func, args).await,
                Value::Builtin(native) => self.call_native(&native, args).await,
                Value::Class(class) => Err(RuntimeError::type_error(format!(
                    "class '{}' must be created with 'notun'",
                    class.name
                ))
                .into()),
                other => Err(RuntimeError::NotCallable(other.repr()).into()),
            }
        })
    }

    async fn call_native(&self, native: &NativeFunction, args: Vec<Value>) -> EvalResult {
        if !native.arity.accepts(args.len()) {
            return Err(RuntimeError::Arity {
                name: native.name.clone(),
                expected: native.arity.describe(),
                found: args.len(),
            }
            .into());
        }
        match &native.imp {
            NativeImpl::Sync(func) => func(self, &args),
            NativeImpl::Async(func) => func(self, args).await,
            NativeImpl::Settle { promise, fulfill } => {
                let value = args.into_iter().next().unwrap_or(Value::Null);
                if *fulfill {
                    promise.resolve(value);
                } else {
                    promise.reject(value);
                }
                Ok(Value::Null)
            }
        }
    }

    pub async fn call_function(&self, func: Rc<Function>, args: Vec<Value>) -> EvalResult {
        let decl = &func.decl;
        if args.len() > decl.params.len() || args.len() < decl.required_params() {
            let expected = if decl.required_params() == decl.params.len() {
                decl.params.len().to_string()
            } else {
                format!("{} to {}", decl.required_params(), decl.params.len())
            };
            return Err(RuntimeError::Arity {
                name: func.name().to_string(),
                expected,
                found: args.len(),
            }
            .into());
        }

        if decl.is_generator {
            return Ok(Value::Generator(Rc::new(Generator::new(func, args))));
        }
        if decl.is_async {
            return Ok(self.spawn_async_call(func, args));
        }
        self.invoke(func, args, None).await
    }

    /// Runs a function body in a fresh call frame.
    pub(crate) fn invoke<'a>(
        &'a self,
        func: Rc<Function>,
        args: Vec<Value>,
        yielder: Option<Rc<Yielder>>,
    ) -> LocalBoxFuture<'a, EvalResult> {
        Box::pin(async move {
            if CALL_DEPTH.try_with(|_| ()).is_err() {
                return CALL_DEPTH
                    .scope(Cell::new(0), self.invoke(func, args, yielder))
                    .await;
            }
            let depth = call_depth() + 1;
            let limit = self.state.options.max_call_depth;
            if depth > limit {
                return Err(RuntimeError::CallDepthExceeded(limit).into());
            }
            let _ = CALL_DEPTH.try_with(|current| current.set(depth));
            let _guard = DepthGuard;

            let env = Environment::child(&func.closure, Scope::Function(yielder));
            if let Some(receiver) = &func.receiver {
                env.define("ei", receiver.clone())?;
            }
            let mut args = args.into_iter();
            for param in &func.decl.params {
                let value = match (args.next(), &param.default) {
                    (Some(value), _) => value,
                    (None, Some(default)) => self.eval_expr(default, &env).await?,
                    (None, None) => Value::Null,
                };
                env.define(&param.name, value)?;
            }

            match &func.decl.body {
                FunctionBody::Block(statements) => match self.exec_block(statements, &env).await {
                    Ok(_) => Ok(Value::Null),
                    Err(Control::Return(value)) => Ok(value),
                    Err(other) => Err(other),
                },
                FunctionBody::Expr(expr) => self.eval_expr(expr, &env).await,
            }
        })
    }

    pub(crate) async fn instantiate(&self, class: Rc<Class>, args: Vec<Value>) -> EvalResult {
        let created = Rc::new(Instance {
            class: Rc::clone(&class),
            fields: RefCell::new(OrderedMap::new()),
        });
        self.register_instance(&created);
        let instance = Value::Instance(created);
        match &class.constructor {
            Some(constructor) => {
                let bound = class.bind(constructor, instance.clone());
                self.call_function(bound, args).await?;
            }
            None if !args.is_empty() => {
                return Err(RuntimeError::Arity {
                    name: class.name.clone(),
                    expected: "0".into(),
                    found: args.len(),
                }
                .into());
            }
            None => {}
        }
        Ok(instance)
    }

    //=============================================
    //            Section 5: Async Scheduling
    //=============================================

    /// Spawns a local task counted by the task tracker; the program keeps
    /// running until all such tasks finish.
    pub fn spawn_tracked<F>(&self, label: &'static str, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let tasks = Rc::clone(&self.state.tasks);
        let id = tasks.register(label);
        trace!(task = id, label, "spawned");
        tokio::task::spawn_local(async move {
            future.await;
            tasks.complete(id);
        });
    }

    fn spawn_async_call(&self, func: Rc<Function>, args: Vec<Value>) -> Value {
        let promise = Rc::new(Promise::new());
        let settle = Rc::clone(&promise);
        let interpreter = self.clone();
        self.spawn_tracked("async-call", async move {
            let result = interpreter.invoke(func, args, None).await;
            interpreter.settle_with(&settle, result).await;
        });
        Value::Promise(promise)
    }

    /// Settles `promise` from the outcome of a script computation. A returned
    /// promise is adopted rather than nested.
    pub(crate) async fn settle_with(&self, promise: &Promise, result: EvalResult) {
        match result {
            Ok(Value::Promise(inner)) | Err(Control::Return(Value::Promise(inner))) => {
                inner.mark_observed();
                match inner.settled().await {
                    Ok(value) => promise.resolve(value),
                    Err(reason) => promise.reject(reason),
                };
            }
            Ok(value) | Err(Control::Return(value)) => {
                promise.resolve(value);
            }
            Err(Control::Throw(thrown)) => {
                debug!(reason = %thrown.message(), "async function rejected");
                promise.reject(thrown.value);
            }
            Err(Control::Exit(code)) => self.request_exit(code),
            Err(Control::Break | Control::Continue) => {
                promise.resolve(Value::Null);
            }
        }
    }

    /// `opekha`: waits for a promise under the configured timeout. Non-promise
    /// values pass through unchanged.
    pub async fn await_value(&self, value: Value) -> EvalResult {
        let promise = match value {
            Value::Promise(promise) => promise,
            other => return Ok(other),
        };
        promise.mark_observed();
        if let Some(outcome) = promise.outcome() {
            return outcome.map_err(Control::throw);
        }

        let timeout = self.state.options.await_timeout;
        let outcome = tokio::select! {
            outcome = promise.settled() => outcome,
            _ = tokio::time::sleep(timeout) => {
                let millis = timeout.as_millis() as u64;
                warn!(timeout_ms = millis, "opekha timed out, rejecting promise");
                let error = RuntimeError::Timeout(millis);
                promise.reject(Value::String(error.to_string()));
                return Err(error.into());
            }
        };
        outcome.map_err(Control::throw)
    }
}

//=============================================/*
//  Interpreter state is shared through Rc; evaluation is async so that
//  opekha can suspend a call chain on the single-threaded LocalSet.
//============================================*/

//=====================================================
// End of file
//=====================================================

//=====================================================
// File: builtins/timers.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Promise and timer built-ins
// Objective: ghumaao sleeps on a tokio timer, sob_proyash joins promises in
//            input order, proyash_banao wraps an executor callback
//=====================================================

use super::{array_arg, callable_arg, exact, fit_args, int_arg, register_async, register_sync};
use crate::interpreter::{
    Control, EvalResult, Interpreter, LocalBoxFuture, NativeArity, NativeFunction, NativeImpl,
    RuntimeError, Value,
};
use crate::runtime::promise::Promise;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "ghumaao", exact(1), sleep);
    register_sync(interpreter, "sob_proyash", exact(1), all);
    register_async(interpreter, "proyash_banao", exact(1), create);
}

//=============================================
//            Section 1: Timers
//=============================================

/// Returns a promise fulfilled with `khali` after `ms` milliseconds.
fn sleep(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let millis = int_arg("ghumaao", args, 0)?;
    if millis < 0 {
        return Err(RuntimeError::argument(format!("ghumaao got negative delay {}", millis)).into());
    }
    let promise = Rc::new(Promise::new());
    let settle = Rc::clone(&promise);
    interpreter.spawn_tracked("timer", async move {
        tokio::time::sleep(Duration::from_millis(millis as u64)).await;
        settle.resolve(Value::Null);
    });
    Ok(Value::Promise(promise))
}

//=============================================
//            Section 2: Combinators
//=============================================

/// Fulfils with every result in input order once all inputs settle, or
/// rejects with the first rejection. Plain values count as already settled.
fn all(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let inputs = array_arg("sob_proyash", args, 0)?.borrow().clone();
    let combined = Rc::new(Promise::new());
    if inputs.is_empty() {
        combined.resolve(Value::array(Vec::new()));
        return Ok(Value::Promise(combined));
    }

    let results = Rc::new(RefCell::new(vec![Value::Null; inputs.len()]));
    let remaining = Rc::new(Cell::new(inputs.len()));

    for (index, input) in inputs.into_iter().enumerate() {
        let results = Rc::clone(&results);
        let remaining = Rc::clone(&remaining);
        let combined = Rc::clone(&combined);
        let finish = move |outcome: Result<Value, Value>| match outcome {
            Ok(value) => {
                results.borrow_mut()[index] = value;
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let values = std::mem::take(&mut *results.borrow_mut());
                    combined.resolve(Value::array(values));
                }
            }
            Err(reason) => {
                trace!(index, "sob_proyash input rejected");
                combined.reject(reason);
            }
        };
        match input {
            Value::Promise(promise) => {
                promise.mark_observed();
                interpreter.spawn_tracked("join-watch", async move {
                    finish(promise.settled().await);
                });
            }
            value => finish(Ok(value)),
        }
    }
    Ok(Value::Promise(combined))
}

/// `proyash_banao(fn(resolve, reject))`. The executor runs immediately; a
/// throw inside it rejects the promise.
fn create<'a>(interpreter: &'a Interpreter, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        let executor = callable_arg("proyash_banao", &args, 0)?;
        let promise = Rc::new(Promise::new());
        let settler = |name: &str, fulfill: bool| {
            Value::Builtin(Rc::new(NativeFunction {
                name: name.to_string(),
                arity: NativeArity::Range { min: 0, max: Some(1) },
                imp: NativeImpl::Settle {
                    promise: Rc::clone(&promise),
                    fulfill,
                },
            }))
        };
        let call_args = fit_args(&executor, vec![settler("resolve", true), settler("reject", false)]);
        match interpreter.call_value(executor, call_args).await {
            Ok(_) | Err(Control::Return(_)) => {}
            Err(Control::Throw(thrown)) => {
                promise.reject(thrown.value);
            }
            Err(other) => return Err(other),
        }
        Ok(Value::Promise(promise))
    })
}


//=====================================================
// End of file
//=====================================================

use super::{at_least, callable_arg, exact, register_async, register_sync, string_arg};
use crate::interpreter::{
    EvalResult, Handle, Interpreter, LocalBoxFuture, RuntimeError, Value,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "ghotona_banao", exact(0), create);
    register_sync(interpreter, "ghotona_shuno", exact(3), listen);
    register_async(interpreter, "ghotona_prokash", at_least(2), emit);
    register_sync(interpreter, "ghotona_bondho", exact(3), unlisten);
}

/// Named listener lists, called in registration order.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RefCell<HashMap<String, Vec<Value>>>,
}

impl EventEmitter {
    pub fn on(&self, event: &str, listener: Value) {
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Removes the first listener identical to `listener`.
    pub fn off(&self, event: &str, listener: &Value) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        match list.iter().position(|candidate| candidate.equals(listener)) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, event: &str) -> Vec<Value> {
        self.listeners
            .borrow()
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    /// Drops every listener; listeners can capture the emitter itself.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

fn emitter_arg(name: &str, args: &[Value]) -> Result<Rc<Handle>, RuntimeError> {
    match args.first() {
        Some(Value::Handle(handle)) if matches!(handle.as_ref(), Handle::Emitter(_)) => {
            Ok(Rc::clone(handle))
        }
        other => Err(RuntimeError::argument(format!(
            "{} expects an emitter as argument 1, got {}",
            name,
            other.map(Value::type_name).unwrap_or("nothing")
        ))),
    }
}

fn with_emitter<T>(handle: &Handle, f: impl FnOnce(&EventEmitter) -> T) -> Option<T> {
    match handle {
        Handle::Emitter(emitter) => Some(f(emitter)),
        Handle::Response(_) => None,
    }
}

fn create(_interpreter: &Interpreter, _args: &[Value]) -> EvalResult {
    Ok(Value::Handle(Rc::new(Handle::Emitter(EventEmitter::default()))))
}

fn listen(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let handle = emitter_arg("ghotona_shuno", args)?;
    let event = string_arg("ghotona_shuno", args, 1)?;
    let listener = callable_arg("ghotona_shuno", args, 2)?;
    with_emitter(&handle, |emitter| emitter.on(event, listener));
    Ok(Value::Null)
}

fn unlisten(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let handle = emitter_arg("ghotona_bondho", args)?;
    let event = string_arg("ghotona_bondho", args, 1)?;
    let removed = with_emitter(&handle, |emitter| emitter.off(event, &args[2])).unwrap_or(false);
    Ok(Value::Bool(removed))
}

/// Calls the listeners registered when the event fires; listeners added
/// during the emit wait for the next one. Returns whether any listener ran.
fn emit<'a>(interpreter: &'a Interpreter, args: Vec<Value>) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        let handle = emitter_arg("ghotona_prokash", &args)?;
        let event = string_arg("ghotona_prokash", &args, 1)?;
        let listeners = with_emitter(&handle, |emitter| emitter.snapshot(event)).unwrap_or_default();
        let payload = args[2..].to_vec();
        for listener in &listeners {
            let result = interpreter.call_value(listener.clone(), payload.clone()).await?;
            if let Value::Promise(promise) = result {
                promise.mark_observed();
            }
        }
        Ok(Value::Bool(!listeners.is_empty()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeOptions;

    #[test]
    fn listeners_keep_registration_order_and_unsubscribe() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let emitter = create(&interpreter, &[]).unwrap();
        let first = interpreter.globals().get("dekho").unwrap();
        let second = interpreter.globals().get("lipi").unwrap();
        let event = Value::from("data");
        listen(&interpreter, &[emitter.clone(), event.clone(), first.clone()]).unwrap();
        listen(&interpreter, &[emitter.clone(), event.clone(), second.clone()]).unwrap();

        let Value::Handle(handle) = &emitter else {
            panic!("expected handle")
        };
        let names: Vec<String> = with_emitter(handle, |em| em.snapshot("data"))
            .unwrap()
            .iter()
            .map(Value::repr)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names[0].contains("dekho"));

        let removed = unlisten(&interpreter, &[emitter.clone(), event.clone(), first]).unwrap();
        assert!(removed.is_truthy());
        let removed = unlisten(&interpreter, &[emitter.clone(), Value::from("other"), second]).unwrap();
        assert!(!removed.is_truthy());
        with_emitter(handle, EventEmitter::clear);
        interpreter.shutdown();
    }

    #[test]
    fn non_emitters_are_rejected() {
        let interpreter = Interpreter::new(RuntimeOptions::default());
        let err = listen(&interpreter, &[Value::Int(1), Value::from("x"), Value::Null]).unwrap_err();
        assert!(format!("{err:?}").contains("emitter"));
        interpreter.shutdown();
    }
}

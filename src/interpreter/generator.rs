//=====================================================
// File: interpreter/generator.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Generator functions for the tree-walking interpreter
// Objective: Run a generator body as a suspended local task that trades
//            values with its caller over a pair of channels
//=====================================================

use super::Interpreter;
use super::errors::{Control, EvalResult, RuntimeError};
use super::value::{Function, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::trace;

//=============================================
//            Section 1: Channel Types
//=============================================

enum GeneratorEvent {
    Yielded(Value),
    Returned(Value),
    Failed(Control),
}

/// The body side of a generator. Reached from `utpadan` through the
/// generator's function scope.
pub struct Yielder {
    events: UnboundedSender<GeneratorEvent>,
    resume: RefCell<Option<UnboundedReceiver<Value>>>,
}

impl Yielder {
    //Function: yield_value
    //Purpose: Hand a value to the consumer and park until the next `next()`
    //Inputs: value: Value
    //Returns: EvalResult - the argument passed to the resuming `next()`
    pub async fn yield_value(&self, value: Value) -> EvalResult {
        if self.events.send(GeneratorEvent::Yielded(value)).is_err() {
            return Err(Control::Return(Value::Null));
        }
        let taken = self.resume.borrow_mut().take();
        let mut resume = taken
            .ok_or_else(|| RuntimeError::type_error("generator resumed while already running"))?;
        let input = resume.recv().await;
        *self.resume.borrow_mut() = Some(resume);
        match input {
            Some(value) => Ok(value),
            // consumer dropped the generator: unwind the body
            None => Err(Control::Return(Value::Null)),
        }
    }
}

//=============================================
//            Section 2: Generator Object
//=============================================

enum GeneratorState {
    Created {
        function: Rc<Function>,
        args: Vec<Value>,
    },
    Suspended {
        resume: UnboundedSender<Value>,
        events: Option<UnboundedReceiver<GeneratorEvent>>,
    },
    Finished,
}

pub struct Generator {
    state: RefCell<GeneratorState>,
}

impl Generator {
    pub fn new(function: Rc<Function>, args: Vec<Value>) -> Self {
        Self {
            state: RefCell::new(GeneratorState::Created { function, args }),
        }
    }

    //Function: resume
    //Purpose: Drive the body to its next `utpadan` or to completion
    //Inputs: interpreter, input (ignored on the first call)
    //Returns: (value, done)
    pub async fn resume(&self, interpreter: &Interpreter, input: Value) -> EvalResult<(Value, bool)> {
        let mut events = {
            let mut state = self.state.borrow_mut();
            match std::mem::replace(&mut *state, GeneratorState::Finished) {
                GeneratorState::Created { function, args } => {
                    let (event_tx, event_rx) = unbounded_channel();
                    let (resume_tx, resume_rx) = unbounded_channel();
                    let yielder = Rc::new(Yielder {
                        events: event_tx.clone(),
                        resume: RefCell::new(Some(resume_rx)),
                    });
                    let body = interpreter.clone();
                    trace!(function = function.name(), "starting generator body");
                    tokio::task::spawn_local(async move {
                        let event = match body.invoke(function, args, Some(yielder)).await {
                            Ok(value) | Err(Control::Return(value)) => GeneratorEvent::Returned(value),
                            Err(control) => GeneratorEvent::Failed(control),
                        };
                        let _ = event_tx.send(event);
                    });
                    *state = GeneratorState::Suspended {
                        resume: resume_tx,
                        events: None,
                    };
                    event_rx
                }
                GeneratorState::Suspended { resume, events } => {
                    let Some(events) = events else {
                        *state = GeneratorState::Suspended { resume, events: None };
                        return Err(RuntimeError::type_error("generator is already running").into());
                    };
                    // a closed channel means the body already ended; its
                    // final event is still queued
                    let _ = resume.send(input);
                    *state = GeneratorState::Suspended { resume, events: None };
                    events
                }
                GeneratorState::Finished => return Ok((Value::Null, true)),
            }
        };

        let event = events.recv().await;
        let mut state = self.state.borrow_mut();
        match event {
            Some(GeneratorEvent::Yielded(value)) => {
                if let GeneratorState::Suspended { events: slot, .. } = &mut *state {
                    *slot = Some(events);
                }
                Ok((value, false))
            }
            Some(GeneratorEvent::Returned(value)) => {
                *state = GeneratorState::Finished;
                Ok((value, true))
            }
            Some(GeneratorEvent::Failed(control)) => {
                *state = GeneratorState::Finished;
                Err(control)
            }
            None => {
                *state = GeneratorState::Finished;
                Ok((Value::Null, true))
            }
        }
    }
}

//=====================================================
// End of file
//=====================================================

use crate::interpreter::Value;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use tracing::warn;

#[derive(Clone)]
enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

/// Single-settlement promise. Waiters are woken in the order they started
/// waiting; settling twice is a no-op.
pub struct Promise {
    state: RefCell<PromiseState>,
    waiters: RefCell<Vec<Option<Waker>>>,
    observed: Cell<bool>,
}

impl Default for Promise {
    fn default() -> Self {
        Self::new()
    }
}

impl Promise {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(PromiseState::Pending),
            waiters: RefCell::new(Vec::new()),
            observed: Cell::new(false),
        }
    }

    pub fn resolve(&self, value: Value) -> bool {
        self.settle(PromiseState::Fulfilled(value))
    }

    pub fn reject(&self, reason: Value) -> bool {
        self.settle(PromiseState::Rejected(reason))
    }

    fn settle(&self, next: PromiseState) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if !matches!(*state, PromiseState::Pending) {
                return false;
            }
            *state = next;
        }
        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for waker in waiters.into_iter().flatten() {
            waker.wake();
        }
        true
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Pending)
    }

    pub fn state_name(&self) -> &'static str {
        match *self.state.borrow() {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled(_) => "fulfilled",
            PromiseState::Rejected(_) => "rejected",
        }
    }

    /// `Some(Ok)` when fulfilled, `Some(Err)` when rejected.
    pub fn outcome(&self) -> Option<Result<Value, Value>> {
        match &*self.state.borrow() {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(value) => Some(Ok(value.clone())),
            PromiseState::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    /// Marks the rejection (if any) as handled by script code.
    pub fn mark_observed(&self) {
        self.observed.set(true);
    }

    /// Resolves once the promise settles.
    pub fn settled(&self) -> Settled<'_> {
        Settled {
            promise: self,
            slot: None,
        }
    }
}

/// Future returned by [`Promise::settled`]. Each waiter keeps one slot in the
/// promise's waiter list so repeated polls do not queue duplicate wakers.
pub struct Settled<'a> {
    promise: &'a Promise,
    slot: Option<usize>,
}

impl Future for Settled<'_> {
    type Output = Result<Value, Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let promise = self.promise;
        if let Some(outcome) = promise.outcome() {
            self.slot = None;
            return Poll::Ready(outcome);
        }
        let mut waiters = promise.waiters.borrow_mut();
        match self.slot {
            Some(idx) if idx < waiters.len() => waiters[idx] = Some(cx.waker().clone()),
            _ => {
                let idx = waiters.len();
                waiters.push(Some(cx.waker().clone()));
                drop(waiters);
                self.slot = Some(idx);
            }
        }
        Poll::Pending
    }
}

impl Drop for Settled<'_> {
    fn drop(&mut self) {
        if let Some(idx) = self.slot
            && let Some(slot) = self.promise.waiters.borrow_mut().get_mut(idx)
        {
            *slot = None;
        }
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        if self.observed.get() {
            return;
        }
        if let PromiseState::Rejected(reason) = &*self.state.borrow() {
            warn!(reason = %reason, "promise rejected without being awaited");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        LocalSet::new().block_on(&runtime, future)
    }

    #[test]
    fn settles_exactly_once() {
        let promise = Promise::new();
        assert!(promise.is_pending());
        assert!(promise.resolve(Value::Int(1)));
        assert!(!promise.reject(Value::from("late")));
        assert!(!promise.resolve(Value::Int(2)));
        match promise.outcome() {
            Some(Ok(Value::Int(1))) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn waiters_resume_in_fifo_order() {
        block_on(async {
            let promise = Rc::new(Promise::new());
            let order = Rc::new(RefCell::new(Vec::new()));
            let mut handles = Vec::new();
            for id in 0..3 {
                let p = Rc::clone(&promise);
                let log = Rc::clone(&order);
                handles.push(tokio::task::spawn_local(async move {
                    let value = p.settled().await.unwrap();
                    log.borrow_mut().push((id, value.to_string()));
                }));
            }
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            promise.resolve(Value::from("done"));
            for handle in handles {
                handle.await.unwrap();
            }
            let ids: Vec<i32> = order.borrow().iter().map(|(id, _)| *id).collect();
            assert_eq!(ids, vec![0, 1, 2]);
        });
    }

    #[test]
    fn settled_returns_rejection() {
        block_on(async {
            let promise = Promise::new();
            promise.mark_observed();
            promise.reject(Value::from("boom"));
            let err = promise.settled().await.unwrap_err();
            assert_eq!(err.to_string(), "boom");
        });
    }
}

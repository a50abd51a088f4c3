use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Bookkeeping for background tasks spawned by async calls, timers and the
/// HTTP server. The driver keeps the program alive while any are active.
#[derive(Default)]
pub struct AsyncControl {
    state: RefCell<HashMap<u64, TaskState>>,
    next_id: Cell<u64>,
    changed: Notify,
}

struct TaskState {
    label: &'static str,
    started: Instant,
}

impl AsyncControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, label: &'static str) -> u64 {
        let task_id = self.next_id.get() + 1;
        self.next_id.set(task_id);
        self.state.borrow_mut().insert(
            task_id,
            TaskState {
                label,
                started: Instant::now(),
            },
        );
        task_id
    }

    pub fn complete(&self, task_id: u64) {
        let removed = self.state.borrow_mut().remove(&task_id);
        if let Some(task) = removed {
            tracing::trace!(
                task = task_id,
                label = task.label,
                elapsed_ms = task.started.elapsed().as_millis() as u64,
                "task finished"
            );
        }
        self.changed.notify_waiters();
    }

    pub fn active(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.state.borrow().is_empty()
    }

    /// How long the oldest active task with `label` has been running.
    pub fn oldest(&self, label: &str) -> Option<Duration> {
        self.state
            .borrow()
            .values()
            .filter(|task| task.label == label)
            .map(|task| task.started.elapsed())
            .max()
    }

    /// Wakes anyone blocked in [`AsyncControl::changed`].
    pub fn notify(&self) {
        self.changed.notify_waiters();
    }

    /// Resolves at the next registration change or explicit notification.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_active_tasks() {
        let control = AsyncControl::new();
        assert!(control.is_idle());
        let first = control.register("async-call");
        let second = control.register("timer");
        assert_ne!(first, second);
        assert_eq!(control.active(), 2);
        assert!(control.oldest("timer").is_some());

        control.complete(first);
        assert_eq!(control.active(), 1);
        control.complete(second);
        assert!(control.is_idle());
        assert!(control.oldest("timer").is_none());
    }

    #[test]
    fn completing_unknown_task_is_harmless() {
        let control = AsyncControl::new();
        control.complete(42);
        assert!(control.is_idle());
    }
}

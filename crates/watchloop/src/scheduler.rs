#![forbid(unsafe_code)]

//! Deferred-callback scheduling seam.
//!
//! The digest engine never talks to real timers. Everything it defers — the
//! `eval_async` trigger and the `apply_async` flush — goes through the
//! [`Scheduler`] trait: "run this callback after the current synchronous
//! extent, with an optional cancel". A host event loop implements it with
//! whatever zero-delay primitive it has; tests and simple embedders use
//! [`ManualScheduler`] and pump it explicitly.
//!
//! # Invariants
//!
//! 1. Tasks run in schedule order (FIFO).
//! 2. A cancelled task never runs; cancelling an already-run or unknown task
//!    is a no-op returning `false`.
//! 3. [`ManualScheduler::run_until_idle`] also runs tasks scheduled *by* the
//!    tasks it runs.

use std::cell::RefCell;
use std::collections::VecDeque;

/// Identifies one scheduled task, for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// A deferred, one-shot task.
pub type Task = Box<dyn FnOnce()>;

/// Macrotask-style deferral: run a callback after the current synchronous
/// extent. Single-threaded; implementations must invoke tasks on the thread
/// that scheduled them.
pub trait Scheduler {
    /// Queue `task` to run later. Returns an id usable with [`cancel`].
    ///
    /// [`cancel`]: Scheduler::cancel
    fn schedule(&self, task: Task) -> TaskId;

    /// Drop a pending task. Returns `true` if the task was still pending.
    fn cancel(&self, id: TaskId) -> bool;
}

/// FIFO scheduler driven by explicit pumping.
///
/// Nothing runs until the owner calls [`run_next`] or [`run_until_idle`] —
/// typically once per host event-loop turn. This is also the synchronous
/// stand-in for real timers in tests.
///
/// [`run_next`]: ManualScheduler::run_next
/// [`run_until_idle`]: ManualScheduler::run_until_idle
#[derive(Default)]
pub struct ManualScheduler {
    inner: RefCell<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    queue: VecDeque<(TaskId, Task)>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Run the oldest pending task. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        let task = self.inner.borrow_mut().queue.pop_front();
        match task {
            Some((_, task)) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue stays empty, including tasks scheduled while
    /// draining. Returns how many tasks ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, task: Task) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = TaskId(inner.next_id);
        inner.next_id += 1;
        inner.queue.push_back((id, task));
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.queue.len();
        inner.queue.retain(|(task_id, _)| *task_id != id);
        inner.queue.len() != before
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn tasks_run_in_fifo_order() {
        let sched = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ["a", "b", "c"] {
            let order = Rc::clone(&order);
            sched.schedule(Box::new(move || order.borrow_mut().push(label)));
        }

        assert_eq!(sched.run_until_idle(), 3);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn cancel_prevents_execution() {
        let sched = ManualScheduler::new();
        let ran = Rc::new(RefCell::new(false));

        let flag = Rc::clone(&ran);
        let id = sched.schedule(Box::new(move || *flag.borrow_mut() = true));

        assert!(sched.cancel(id));
        assert_eq!(sched.run_until_idle(), 0);
        assert!(!*ran.borrow());
    }

    #[test]
    fn cancel_after_run_is_noop() {
        let sched = ManualScheduler::new();
        let id = sched.schedule(Box::new(|| {}));
        assert!(sched.run_next());
        assert!(!sched.cancel(id));
    }

    #[test]
    fn tasks_scheduled_during_drain_also_run() {
        let sched = Rc::new(ManualScheduler::new());
        let count = Rc::new(RefCell::new(0));

        let inner_sched = Rc::clone(&sched);
        let inner_count = Rc::clone(&count);
        sched.schedule(Box::new(move || {
            *inner_count.borrow_mut() += 1;
            let count = Rc::clone(&inner_count);
            inner_sched.schedule(Box::new(move || *count.borrow_mut() += 1));
        }));

        assert_eq!(sched.run_until_idle(), 2);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn run_next_on_empty_queue_returns_false() {
        let sched = ManualScheduler::new();
        assert!(!sched.run_next());
    }

    #[test]
    fn task_ids_are_unique() {
        let sched = ManualScheduler::new();
        let a = sched.schedule(Box::new(|| {}));
        let b = sched.schedule(Box::new(|| {}));
        assert_ne!(a, b);
    }
}

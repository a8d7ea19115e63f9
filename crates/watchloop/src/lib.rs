#![forbid(unsafe_code)]

//! Dirty-checking change propagation for two-way data binding.
//!
//! `watchloop` keeps derived state in sync with mutated state without change
//! notifications from the mutator. User code registers *watch functions* on a
//! [`Scope`]; each computes a [`Value`] from the scope's state. A
//! [`digest`](Scope::digest) repeatedly evaluates every watch, compares the
//! result against the previous snapshot, and fires the paired listener on
//! change, looping until a full pass is clean (or an iteration budget runs
//! out). Deferred work is layered on top: [`eval_async`](Scope::eval_async)
//! folds an expression into the current or next digest, and
//! [`apply_async`](Scope::apply_async) coalesces a burst of apply requests
//! into a single digest on the next scheduler turn.
//!
//! Execution is single-threaded and cooperative: "async" means deferral
//! through the injected [`Scheduler`], never parallelism.
//!
//! # Invariants
//!
//! 1. Watchers run in registration order; queues drain FIFO.
//! 2. A watcher's first evaluation always fires its listener, with the fresh
//!    value as both `new` and `old`.
//! 3. NaN is a stable observed value (equal to itself) in both equality
//!    strategies.
//! 4. Failures in watch/listener callbacks are reported and isolated; only
//!    re-entrancy and convergence failures ([`ScopeError`]) reach callers.
//! 5. Re-entrant top-level `digest`/`apply` on the same scope is rejected,
//!    never queued.

pub mod error;
pub mod scheduler;
pub mod scope;
pub mod value;

pub use error::{CallbackError, ScopeError};
pub use scheduler::{ManualScheduler, Scheduler, Task, TaskId};
pub use scope::{DIGEST_TTL, Phase, Scope, WatchHandle, WeakScope};
pub use value::{Equality, Value};

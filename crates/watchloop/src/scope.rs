#![forbid(unsafe_code)]

//! Scope: watcher registry and digest convergence loop.
//!
//! A [`Scope<S>`] owns arbitrary user state `S` plus an ordered registry of
//! watchers. Each watcher pairs a *watch function* (pure read of the scope
//! producing a [`Value`]) with a *listener* invoked when that value changes.
//! Nothing notifies the scope about mutations; instead [`digest`] repeatedly
//! evaluates every watch function, compares against the previous snapshot,
//! and fires listeners until a full pass reports no change.
//!
//! `Scope` is a cheap cloneable handle (`Rc` internally, single-threaded).
//! Deferred work ([`eval_async`], [`apply_async`]) goes through the injected
//! [`Scheduler`] and holds only a [`WeakScope`], so a pending timer never
//! keeps a dropped scope alive.
//!
//! # Invariants
//!
//! 1. Watchers are evaluated in registration order, oldest first; watchers
//!    registered during a pass are evaluated later in that same pass.
//! 2. A watcher's first evaluation always counts as a change, and its
//!    listener sees `new` as both arguments on that first call.
//! 3. Removing a watcher (from anywhere, including mid-pass from a listener)
//!    prevents any further evaluation of it and resets the clean-circuit
//!    short-circuit marker.
//! 4. The async and apply-async queues drain strictly FIFO; the apply-async
//!    flush also drains entries appended while it is running.
//! 5. At most one deferred apply-async flush is outstanding per scope.
//! 6. The phase marker is cleared on every exit path of `digest`/`apply`,
//!    including the convergence-error path.
//!
//! # Failure Modes
//!
//! - A watch or listener failure ([`CallbackError`]) is logged and isolated:
//!   the watcher is treated as clean for that pass, other watchers are
//!   unaffected, and no error escapes the digest.
//! - A digest still dirty after its iteration budget (default
//!   [`DIGEST_TTL`]) fails with [`ScopeError::IterationLimit`]; state keeps
//!   whatever was last committed.
//! - Calling `digest`/`apply` from inside either fails with
//!   [`ScopeError::PhaseInProgress`] without touching scope state.
//!
//! # Example
//!
//! ```ignore
//! let (scope, scheduler) = Scope::with_manual_scheduler(Model::default());
//!
//! scope.watch(
//!     |scope: &Scope<Model>| scope.with(|m| Value::from(m.name.as_str())),
//!     |new, _old, scope| {
//!         let upper = new.as_str().unwrap_or("").to_uppercase();
//!         scope.with_mut(|m| m.name_upper = upper);
//!     },
//! );
//!
//! scope.with_mut(|m| m.name = "jane".into());
//! scope.digest()?;
//! ```
//!
//! [`digest`]: Scope::digest
//! [`eval_async`]: Scope::eval_async
//! [`apply_async`]: Scope::apply_async

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::error::{CallbackError, ScopeError};
use crate::scheduler::{Scheduler, TaskId};
use crate::value::{Equality, Value};

/// Default digest iteration budget.
pub const DIGEST_TTL: u32 = 10;

/// The top-level operation currently executing on a scope, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A digest loop is running on the scope.
    Digest,
    /// An `apply` expression (and its follow-up digest) is running.
    Apply,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digest => write!(f, "digest"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

/// Identity of one registered watcher, stable for the life of the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WatchId(u64);

type WatchFn<S> = Box<dyn FnMut(&Scope<S>) -> Result<Value, CallbackError>>;
type ListenerFn<S> = Box<dyn FnMut(&Value, &Value, &Scope<S>) -> Result<(), CallbackError>>;
type AsyncTask<S> = Box<dyn FnOnce(&Scope<S>)>;

struct Watcher<S> {
    watch: WatchFn<S>,
    listener: ListenerFn<S>,
    equality: Equality,
    /// Previous observed value; `None` means "never evaluated" and is
    /// distinct from `Some(Value::Null)`.
    last: Option<Value>,
}

/// Registry slot. The id lives outside the watcher's `RefCell` so removal
/// can match a slot while the pass has that watcher borrowed.
struct WatchSlot<S> {
    id: WatchId,
    cell: Rc<RefCell<Watcher<S>>>,
}

struct Ctl<S> {
    /// Tombstoned slot vector: `None` marks a removed watcher. Indices stay
    /// stable during a pass; compaction happens only at digest entry.
    watchers: Vec<Option<WatchSlot<S>>>,
    next_watch_id: u64,
    /// Most recent dirty watcher in the current digest; clean-circuit
    /// short-circuit marker. Reset on any registry change.
    last_dirty: Option<WatchId>,
    async_queue: VecDeque<AsyncTask<S>>,
    apply_async_queue: VecDeque<AsyncTask<S>>,
    /// Pending deferred flush, at most one outstanding.
    apply_async_task: Option<TaskId>,
    phase: Option<Phase>,
    ttl: u32,
}

impl<S> Default for Ctl<S> {
    fn default() -> Self {
        Self {
            watchers: Vec::new(),
            next_watch_id: 0,
            last_dirty: None,
            async_queue: VecDeque::new(),
            apply_async_queue: VecDeque::new(),
            apply_async_task: None,
            phase: None,
            ttl: DIGEST_TTL,
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Shared handle to user state plus its watcher registry and digest machinery.
pub struct Scope<S> {
    state: Rc<RefCell<S>>,
    ctl: Rc<RefCell<Ctl<S>>>,
    scheduler: Rc<dyn Scheduler>,
}

impl<S> Clone for Scope<S> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            ctl: Rc::clone(&self.ctl),
            scheduler: Rc::clone(&self.scheduler),
        }
    }
}

impl<S> std::fmt::Debug for Scope<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ctl = self.ctl.borrow();
        f.debug_struct("Scope")
            .field("watchers", &ctl.watchers.iter().flatten().count())
            .field("phase", &ctl.phase)
            .finish()
    }
}

/// Non-owning handle used by deferred callbacks.
pub struct WeakScope<S> {
    state: Weak<RefCell<S>>,
    ctl: Weak<RefCell<Ctl<S>>>,
    scheduler: Weak<dyn Scheduler>,
}

impl<S> Clone for WeakScope<S> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
            ctl: Weak::clone(&self.ctl),
            scheduler: Weak::clone(&self.scheduler),
        }
    }
}

impl<S> WeakScope<S> {
    /// Recover a full handle if the scope is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Scope<S>> {
        Some(Scope {
            state: self.state.upgrade()?,
            ctl: self.ctl.upgrade()?,
            scheduler: self.scheduler.upgrade()?,
        })
    }
}

/// Deregistration capability returned by the `watch` family.
///
/// `unwatch` removes exactly the watcher it was issued for; calling it again
/// (or after the scope is gone) is a no-op. Cloneable so a listener can
/// capture a handle to its own watcher.
pub struct WatchHandle<S> {
    ctl: Weak<RefCell<Ctl<S>>>,
    id: WatchId,
}

impl<S> Clone for WatchHandle<S> {
    fn clone(&self) -> Self {
        Self {
            ctl: Weak::clone(&self.ctl),
            id: self.id,
        }
    }
}

impl<S> std::fmt::Debug for WatchHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.id.0)
            .field("active", &self.is_active())
            .finish()
    }
}

impl<S> WatchHandle<S> {
    /// Remove the watcher. Idempotent; safe to call mid-pass, including from
    /// the watcher's own watch function or listener.
    pub fn unwatch(&self) {
        let Some(ctl) = self.ctl.upgrade() else {
            return;
        };
        let mut ctl = ctl.borrow_mut();
        let mut removed = false;
        for slot in &mut ctl.watchers {
            if slot.as_ref().is_some_and(|s| s.id == self.id) {
                *slot = None;
                removed = true;
                break;
            }
        }
        if removed {
            // The clean-circuit guarantee only holds for a stable registry.
            ctl.last_dirty = None;
        }
    }

    /// Whether the watcher is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ctl.upgrade().is_some_and(|ctl| {
            ctl.borrow()
                .watchers
                .iter()
                .flatten()
                .any(|s| s.id == self.id)
        })
    }
}

/// Clears the phase marker when dropped, covering error and panic exits.
struct PhaseGuard<'a, S> {
    scope: &'a Scope<S>,
}

impl<S> Drop for PhaseGuard<'_, S> {
    fn drop(&mut self) {
        self.scope.ctl.borrow_mut().phase = None;
    }
}

impl<S: 'static> Scope<S> {
    /// Create a scope over `state`, deferring async work to `scheduler`.
    pub fn new(state: S, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            ctl: Rc::new(RefCell::new(Ctl::default())),
            scheduler,
        }
    }

    /// Create a scope with a fresh [`ManualScheduler`], returning both. The
    /// caller pumps the scheduler once per event-loop turn.
    ///
    /// [`ManualScheduler`]: crate::scheduler::ManualScheduler
    pub fn with_manual_scheduler(state: S) -> (Self, Rc<crate::scheduler::ManualScheduler>) {
        let scheduler = Rc::new(crate::scheduler::ManualScheduler::new());
        let scope = Self::new(state, Rc::clone(&scheduler) as Rc<dyn Scheduler>);
        (scope, scheduler)
    }

    /// Downgrade to a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakScope<S> {
        WeakScope {
            state: Rc::downgrade(&self.state),
            ctl: Rc::downgrade(&self.ctl),
            scheduler: Rc::downgrade(&self.scheduler),
        }
    }

    /// Read the user state.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Mutate the user state. No notification happens here; changes are
    /// picked up by the next digest.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    /// The currently active top-level operation, if any.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        self.ctl.borrow().phase
    }

    /// Number of registered watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.ctl.borrow().watchers.iter().flatten().count()
    }

    /// Replace the digest iteration budget (default [`DIGEST_TTL`]).
    pub fn set_digest_ttl(&self, limit: u32) {
        self.ctl.borrow_mut().ttl = limit;
    }

    // -- registration -------------------------------------------------------

    /// Register a watcher with [`Equality::Identity`].
    pub fn watch<W, L>(&self, watch: W, listener: L) -> WatchHandle<S>
    where
        W: FnMut(&Scope<S>) -> Value + 'static,
        L: FnMut(&Value, &Value, &Scope<S>) + 'static,
    {
        self.watch_with(Equality::Identity, watch, listener)
    }

    /// Register a watcher with an explicit equality strategy.
    pub fn watch_with<W, L>(&self, equality: Equality, mut watch: W, mut listener: L) -> WatchHandle<S>
    where
        W: FnMut(&Scope<S>) -> Value + 'static,
        L: FnMut(&Value, &Value, &Scope<S>) + 'static,
    {
        self.watch_fallible(
            equality,
            move |scope| Ok(watch(scope)),
            move |new, old, scope| {
                listener(new, old, scope);
                Ok(())
            },
        )
    }

    /// Register a watch function with no listener, for watch functions that
    /// act through their own side effects.
    pub fn watch_action<W>(&self, watch: W) -> WatchHandle<S>
    where
        W: FnMut(&Scope<S>) -> Value + 'static,
    {
        self.watch(watch, |_, _, _| {})
    }

    /// Register a watcher whose callbacks may fail. Failures are reported
    /// via `tracing::error!` and isolated: the watcher contributes nothing
    /// to the pass it failed in, and other watchers are unaffected.
    pub fn watch_fallible<W, L>(&self, equality: Equality, watch: W, listener: L) -> WatchHandle<S>
    where
        W: FnMut(&Scope<S>) -> Result<Value, CallbackError> + 'static,
        L: FnMut(&Value, &Value, &Scope<S>) -> Result<(), CallbackError> + 'static,
    {
        let mut ctl = self.ctl.borrow_mut();
        let id = WatchId(ctl.next_watch_id);
        ctl.next_watch_id += 1;
        ctl.watchers.push(Some(WatchSlot {
            id,
            cell: Rc::new(RefCell::new(Watcher {
                watch: Box::new(watch),
                listener: Box::new(listener),
                equality,
                last: None,
            })),
        }));
        // Registry changed; the clean-circuit marker no longer applies.
        ctl.last_dirty = None;
        WatchHandle {
            ctl: Rc::downgrade(&self.ctl),
            id,
        }
    }

    // -- evaluation ---------------------------------------------------------

    /// Execute `expr` against this scope synchronously. No phase handling,
    /// no digest.
    pub fn eval<R>(&self, expr: impl FnOnce(&Scope<S>) -> R) -> R {
        expr(self)
    }

    /// [`eval`](Scope::eval) with an extra caller-supplied argument.
    pub fn eval_with<L, R>(&self, locals: L, expr: impl FnOnce(&Scope<S>, L) -> R) -> R {
        expr(self, locals)
    }

    /// Execute `expr` inside the apply phase, then run a full digest.
    ///
    /// The digest runs even though `expr` has already finished mutating —
    /// that is the point: callers integrate foreign changes without knowing
    /// which watchers care. A convergence failure from that digest
    /// propagates; `expr`'s own result is returned on success.
    pub fn apply<R>(&self, expr: impl FnOnce(&Scope<S>) -> R) -> Result<R, ScopeError> {
        self.begin_phase(Phase::Apply)?;
        let result = {
            let _phase = PhaseGuard { scope: self };
            self.eval(expr)
        };
        self.digest()?;
        Ok(result)
    }

    /// [`apply`](Scope::apply) for expressions that may fail. The follow-up
    /// digest runs whether the expression succeeded or not, so a partial
    /// mutation made before the failure is still integrated.
    ///
    /// The outer `Result` carries re-entrancy and convergence errors; the
    /// inner one is the expression's own outcome.
    pub fn apply_fallible<R>(
        &self,
        expr: impl FnOnce(&Scope<S>) -> Result<R, CallbackError>,
    ) -> Result<Result<R, CallbackError>, ScopeError> {
        self.begin_phase(Phase::Apply)?;
        let result = {
            let _phase = PhaseGuard { scope: self };
            self.eval(expr)
        };
        self.digest()?;
        Ok(result)
    }

    /// Queue `expr` for evaluation inside the current digest if one is
    /// running, or inside a digest triggered on the next scheduler turn.
    ///
    /// The deferred trigger is scheduled only when no phase is active and
    /// the queue was empty, so at most one trigger is ever outstanding; when
    /// it fires it digests only if the queue was not already drained by an
    /// intervening digest.
    pub fn eval_async(&self, expr: impl FnOnce(&Scope<S>) + 'static) {
        let needs_trigger = {
            let ctl = self.ctl.borrow();
            ctl.phase.is_none() && ctl.async_queue.is_empty()
        };
        if needs_trigger {
            let weak = self.downgrade();
            self.scheduler.schedule(Box::new(move || {
                let Some(scope) = weak.upgrade() else {
                    return;
                };
                let queued = !scope.ctl.borrow().async_queue.is_empty();
                if queued {
                    // No caller to propagate to from a timer turn.
                    if let Err(error) = scope.digest() {
                        tracing::error!(%error, "deferred digest failed");
                    }
                }
            }));
        }
        self.ctl.borrow_mut().async_queue.push_back(Box::new(expr));
    }

    /// Queue `expr` to run inside a single batched apply on the next
    /// scheduler turn. Calls arriving before that turn coalesce into the
    /// same apply/digest cycle; an explicit digest that runs first flushes
    /// the batch itself and cancels the deferred flush.
    pub fn apply_async(&self, expr: impl FnOnce(&Scope<S>) + 'static) {
        self.ctl
            .borrow_mut()
            .apply_async_queue
            .push_back(Box::new(expr));

        let needs_flush = self.ctl.borrow().apply_async_task.is_none();
        if needs_flush {
            let weak = self.downgrade();
            let id = self.scheduler.schedule(Box::new(move || {
                let Some(scope) = weak.upgrade() else {
                    return;
                };
                if let Err(error) = scope.apply(|scope| scope.flush_apply_async()) {
                    tracing::error!(%error, "batched apply failed");
                }
            }));
            self.ctl.borrow_mut().apply_async_task = Some(id);
        }
    }

    // -- digest -------------------------------------------------------------

    /// Run digest passes until no watcher reports a change and no async work
    /// remains queued, within the scope's iteration budget.
    pub fn digest(&self) -> Result<(), ScopeError> {
        self.begin_phase(Phase::Digest)?;
        let _phase = PhaseGuard { scope: self };
        let _span = tracing::debug_span!("digest", watchers = self.watcher_count()).entered();

        let limit = {
            let mut ctl = self.ctl.borrow_mut();
            ctl.last_dirty = None;
            // Safe to drop tombstones here: no pass is iterating.
            ctl.watchers.retain(Option::is_some);
            ctl.ttl
        };

        // Fold a pending apply-async batch into this digest instead of
        // paying for a second one when its timer fires. The task slot stays
        // occupied until the flush finishes so thunks queued mid-drain join
        // this batch rather than scheduling a new one.
        let pending_flush = self.ctl.borrow().apply_async_task;
        if let Some(task) = pending_flush {
            self.scheduler.cancel(task);
            self.flush_apply_async();
        }

        let mut budget = limit;
        loop {
            loop {
                let task = self.ctl.borrow_mut().async_queue.pop_front();
                match task {
                    Some(task) => self.eval(task),
                    None => break,
                }
            }

            let dirty = self.digest_once();
            let queued = !self.ctl.borrow().async_queue.is_empty();
            tracing::trace!(dirty, queued, budget, "digest pass complete");
            if !(dirty || queued) {
                break;
            }
            if budget == 0 {
                return Err(ScopeError::IterationLimit { limit });
            }
            budget -= 1;
        }
        Ok(())
    }

    /// One traversal of the registry in registration order. Returns whether
    /// any watcher was dirty.
    fn digest_once(&self) -> bool {
        let mut dirty = false;
        let mut idx = 0;
        loop {
            // Borrow the registry only long enough to fetch the slot, so
            // callbacks can freely register and remove watchers.
            let entry = {
                let ctl = self.ctl.borrow();
                match ctl.watchers.get(idx) {
                    None => break,
                    Some(slot) => slot.as_ref().map(|s| (s.id, Rc::clone(&s.cell))),
                }
            };
            idx += 1;
            let Some((id, cell)) = entry else {
                // Removed mid-pass; skip the tombstone.
                continue;
            };

            let mut watcher = cell.borrow_mut();
            let new = match (watcher.watch)(self) {
                Ok(value) => value,
                Err(error) => {
                    tracing::error!(%error, "watch function failed; treating watcher as clean");
                    continue;
                }
            };

            let changed = match &watcher.last {
                None => true,
                Some(prev) => !new.matches(prev, watcher.equality),
            };

            if changed {
                self.ctl.borrow_mut().last_dirty = Some(id);
                // First-ever evaluation: the listener sees the fresh value
                // as both arguments, never the sentinel.
                let old = watcher.last.take().unwrap_or_else(|| new.clone());
                watcher.last = Some(match watcher.equality {
                    Equality::Deep => new.deep_clone(),
                    Equality::Identity => new.clone(),
                });
                if let Err(error) = (watcher.listener)(&new, &old, self) {
                    tracing::error!(%error, "listener failed");
                }
                dirty = true;
            } else if self.ctl.borrow().last_dirty == Some(id) {
                // Full clean circuit since the last dirty watcher; the rest
                // of the registry is known clean.
                break;
            }
        }
        dirty
    }

    fn flush_apply_async(&self) {
        // Drain until empty, including thunks queued during the drain.
        loop {
            let task = self.ctl.borrow_mut().apply_async_queue.pop_front();
            match task {
                Some(task) => self.eval(task),
                None => break,
            }
        }
        self.ctl.borrow_mut().apply_async_task = None;
    }

    fn begin_phase(&self, phase: Phase) -> Result<(), ScopeError> {
        let mut ctl = self.ctl.borrow_mut();
        if let Some(active) = ctl.phase {
            return Err(ScopeError::PhaseInProgress(active));
        }
        ctl.phase = Some(phase);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    fn scope() -> Scope<i32> {
        Scope::new(0, Rc::new(ManualScheduler::new()))
    }

    #[test]
    fn eval_returns_expression_result() {
        let scope = scope();
        scope.with_mut(|n| *n = 21);
        let doubled = scope.eval(|scope| scope.with(|n| n * 2));
        assert_eq!(doubled, 42);
    }

    #[test]
    fn eval_with_passes_locals() {
        let scope = scope();
        scope.with_mut(|n| *n = 40);
        let sum = scope.eval_with(2, |scope, extra| scope.with(|n| n + extra));
        assert_eq!(sum, 42);
    }

    #[test]
    fn digest_sets_and_clears_phase() {
        let scope = scope();
        assert_eq!(scope.phase(), None);

        let seen = Rc::new(RefCell::new(None));
        let probe = Rc::clone(&seen);
        scope.watch_action(move |scope| {
            *probe.borrow_mut() = scope.phase();
            Value::Null
        });

        scope.digest().unwrap();
        assert_eq!(*seen.borrow(), Some(Phase::Digest));
        assert_eq!(scope.phase(), None);
    }

    #[test]
    fn nested_apply_is_rejected() {
        let scope = scope();
        let inner = scope
            .apply(|scope| scope.apply(|_| ()))
            .expect("outer apply succeeds");
        assert_eq!(inner, Err(ScopeError::PhaseInProgress(Phase::Apply)));
    }

    #[test]
    fn digest_from_listener_is_rejected() {
        let scope = scope();
        let seen = Rc::new(RefCell::new(None));

        let probe = Rc::clone(&seen);
        scope.watch(
            |scope| scope.with(|n| Value::from(*n)),
            move |_, _, scope| {
                *probe.borrow_mut() = Some(scope.digest());
            },
        );

        scope.digest().unwrap();
        assert_eq!(
            *seen.borrow(),
            Some(Err(ScopeError::PhaseInProgress(Phase::Digest)))
        );
    }

    #[test]
    fn phase_cleared_after_convergence_failure() {
        let scope = scope();
        scope.watch(
            |scope| scope.with(|n| Value::from(*n)),
            |_, _, scope| {
                scope.with_mut(|n| *n += 1);
            },
        );

        assert!(scope.digest().is_err());
        assert_eq!(scope.phase(), None);
        // The scope is usable again once the instability is gone.
        assert_eq!(scope.watcher_count(), 1);
    }

    #[test]
    fn watcher_count_tracks_registration_and_removal() {
        let scope = scope();
        assert_eq!(scope.watcher_count(), 0);

        let a = scope.watch_action(|_| Value::Null);
        let b = scope.watch_action(|_| Value::Null);
        assert_eq!(scope.watcher_count(), 2);

        a.unwatch();
        assert_eq!(scope.watcher_count(), 1);
        assert!(!a.is_active());
        assert!(b.is_active());
    }

    #[test]
    fn unwatch_is_idempotent() {
        let scope = scope();
        let handle = scope.watch_action(|_| Value::Null);
        handle.unwatch();
        handle.unwatch();
        assert_eq!(scope.watcher_count(), 0);
    }

    #[test]
    fn unwatch_after_scope_drop_is_noop() {
        let handle = {
            let scope = scope();
            scope.watch_action(|_| Value::Null)
        };
        assert!(!handle.is_active());
        handle.unwatch();
    }

    #[test]
    fn custom_ttl_is_reported_in_the_error() {
        let scope = scope();
        scope.set_digest_ttl(3);
        scope.watch(
            |scope| scope.with(|n| Value::from(*n)),
            |_, _, scope| {
                scope.with_mut(|n| *n += 1);
            },
        );
        assert_eq!(
            scope.digest(),
            Err(ScopeError::IterationLimit { limit: 3 })
        );
    }

    #[test]
    fn weak_scope_upgrade_fails_after_drop() {
        let weak = {
            let scope = scope();
            scope.downgrade()
        };
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn clones_share_the_same_registry() {
        let scope = scope();
        let alias = scope.clone();
        alias.watch_action(|_| Value::Null);
        assert_eq!(scope.watcher_count(), 1);
    }
}

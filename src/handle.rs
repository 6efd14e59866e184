use std::any::Any;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pool::PoolInner;

/// Outcome of a single `compute()` evaluation, including a caught panic.
enum Outcome<V> {
    Ready(V),
    Panicked(Box<dyn Any + Send + 'static>),
}

/// A one-shot container tying a forked task to its in-flight asynchronous execution.
///
/// `EvalHandle` is created by [`fork`](crate::Fork::fork), enqueued on the forking thread's
/// deque, and dequeued by whichever endpoint (possibly the same thread) services it next.
/// The result slot is written exactly once, by whichever thread calls [`publish`], and is
/// only ever read after observing [`is_complete`] return `true` -- the `complete` flag's
/// release/acquire pair is the entire synchronization contract; no lock guards the slot.
///
/// [`publish`]: EvalHandle::publish
/// [`is_complete`]: EvalHandle::is_complete
pub(crate) struct EvalHandle<V> {
    pool: Arc<PoolInner>,
    complete: AtomicBool,
    outcome: UnsafeCell<Option<Outcome<V>>>,
}

// SAFETY: `outcome` is only written once, by the thread that calls `publish`, strictly
// before `complete` is stored with Release ordering. It is only read by `take_result`,
// which the caller must only invoke after observing `complete == true` via an Acquire
// load -- that load happens-before the write becomes visible, so there is no data race.
unsafe impl<V: Send> Send for EvalHandle<V> {}
unsafe impl<V: Send> Sync for EvalHandle<V> {}

impl<V> EvalHandle<V> {
    pub(crate) fn new(pool: Arc<PoolInner>) -> Self {
        EvalHandle {
            pool,
            complete: AtomicBool::new(false),
            outcome: UnsafeCell::new(None),
        }
    }

    /// The pool this handle was forked in, used only for `WrongPool` validation at join time.
    pub(crate) fn pool(&self) -> &Arc<PoolInner> {
        &self.pool
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    fn publish(&self, outcome: Outcome<V>) {
        // SAFETY: exactly one thread ever calls `publish` for a given handle (the thread
        // that dequeues and runs its `ForkRunner`), and it does so before the Release store
        // below, which is the only publication point for readers.
        unsafe {
            *self.outcome.get() = Some(outcome);
        }
        self.complete.store(true, Ordering::Release);
    }

    pub(crate) fn publish_ok(&self, value: V) {
        self.publish(Outcome::Ready(value));
    }

    pub(crate) fn publish_panic(&self, payload: Box<dyn Any + Send + 'static>) {
        self.publish(Outcome::Panicked(payload));
    }

    /// Consumes the published outcome. Must only be called after `is_complete()` returns
    /// `true`. Resumes the original panic if `compute()` unwound rather than returning.
    pub(crate) fn take_result(&self) -> V {
        debug_assert!(self.is_complete(), "take_result called before completion");
        // SAFETY: `complete == true` (checked above) happens-after the Release store in
        // `publish`, so this read observes the fully-initialized outcome.
        let outcome = unsafe { (*self.outcome.get()).take() };
        match outcome.expect("EvalHandle polled twice or completed without a result") {
            Outcome::Ready(value) => value,
            Outcome::Panicked(payload) => std::panic::resume_unwind(payload),
        }
    }
}

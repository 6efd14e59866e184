use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use log::trace;

use crate::error::{ForkError, JoinError};
use crate::handle::EvalHandle;
use crate::registry;
use crate::runnable::Runnable;

/// A user-defined unit of divide-and-conquer work.
///
/// `Task` only describes *what* to compute. Forking and joining are operations on a
/// [`Fork`] wrapper around a task, not on the task itself -- `compute` takes `&self`, just
/// like `fork`/`join` do, so the fork/join bookkeeping (the single-slot handle and
/// single-shot joined flag) can live alongside the task payload in `Fork<T>` without the
/// task ever being moved out from under it.
pub trait Task: Send {
    /// The value produced by a completed computation.
    type Output: Send;

    /// Runs this task's work, synchronously, on whichever thread calls it.
    fn compute(&self) -> Self::Output;
}

/// The type-erased handle installed by [`Fork::fork`] and run by some endpoint.
struct ForkRunner<T: Task> {
    task: T,
    handle: Arc<EvalHandle<T::Output>>,
}

impl<T: Task> Runnable for ForkRunner<T> {
    fn run(self: Box<Self>) {
        let ForkRunner { task, handle } = *self;
        match panic::catch_unwind(AssertUnwindSafe(|| task.compute())) {
            Ok(value) => handle.publish_ok(value),
            Err(payload) => handle.publish_panic(payload),
        }
    }
}

/// Fork/join bookkeeping for one task instance: a single-slot reference to its current
/// evaluation handle, and a single-shot flag recording whether it has been joined.
enum ForkState<T: Task> {
    /// Not yet forked; the task payload is still here.
    Pending(T),
    /// Forked, not yet joined.
    Forked(Arc<EvalHandle<T::Output>>),
    /// Joined; the handle is kept only so a second `join()` can be told `AlreadyJoined`.
    Joined(Arc<EvalHandle<T::Output>>),
}

/// A task paired with its fork/join state.
///
/// `Fork::new(task)` wraps a task so that it can be `fork()`-ed for asynchronous
/// evaluation by a peer endpoint and later `join()`-ed, cooperatively executing other
/// pending work while it waits, from the same or a different thread attached to the same
/// pool. Enforces the invariants: at most one `fork`, at most one `join`, a
/// `join` requires a prior `fork` in the *same* pool.
///
/// ```no_run
/// use forkjoin_pool::{Fork, Pool, Task};
///
/// struct Double(u64);
///
/// impl Task for Double {
///     type Output = u64;
///     fn compute(&self) -> u64 {
///         self.0 * 2
///     }
/// }
///
/// let pool = Pool::new_default();
/// struct Parent;
/// impl Task for Parent {
///     type Output = u64;
///     fn compute(&self) -> u64 {
///         let child = Fork::new(Double(21));
///         child.fork().unwrap();
///         child.join().unwrap()
///     }
/// }
/// assert_eq!(pool.invoke(Parent).unwrap(), 42);
/// ```
pub struct Fork<T: Task> {
    state: Mutex<ForkState<T>>,
}

impl<T: Task> std::fmt::Debug for Fork<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match &*self.state.lock().unwrap() {
            ForkState::Pending(_) => "pending",
            ForkState::Forked(_) => "forked",
            ForkState::Joined(_) => "joined",
        };
        f.debug_struct("Fork").field("state", &stage).finish()
    }
}

impl<T: Task + 'static> Fork<T> {
    /// Wraps `task`, ready to be forked.
    pub fn new(task: T) -> Self {
        Fork {
            state: Mutex::new(ForkState::Pending(task)),
        }
    }

    /// Publishes this task for asynchronous evaluation by some peer endpoint.
    ///
    /// Resolves the calling thread's current sampler via the thread registry; fails with
    /// [`ForkError::NotInPool`] if there is none. Fails with [`ForkError::AlreadyForked`]
    /// if this task was already forked.
    pub fn fork(&self) -> Result<(), ForkError> {
        let sampler = registry::current().ok_or(ForkError::NotInPool)?;

        let mut guard = self.state.lock().unwrap();
        if !matches!(&*guard, ForkState::Pending(_)) {
            return Err(ForkError::AlreadyForked);
        }

        let handle = Arc::new(EvalHandle::new(sampler.pool().clone()));
        let previous = mem::replace(&mut *guard, ForkState::Forked(handle.clone()));
        drop(guard);

        let task = match previous {
            ForkState::Pending(task) => task,
            _ => unreachable!("checked above"),
        };

        trace!("forking task onto current sampler's deque");
        sampler.add(Box::new(ForkRunner { task, handle }));
        Ok(())
    }

    /// Waits for a previously forked task to complete and returns its result.
    ///
    /// Resolves the calling thread's current sampler; fails with [`JoinError::NotInPool`]
    /// if there is none. Fails with [`JoinError::NotForked`] if `fork` was never called.
    /// Otherwise checks [`JoinError::WrongPool`] -- whether the matching `fork` ran in a
    /// different pool than the one currently attached -- ahead of and independent of
    /// whether this is a repeat call, then fails with [`JoinError::AlreadyJoined`] if `join`
    /// was already called in the right pool.
    ///
    /// While waiting, cooperatively executes other pending work reachable from the current
    /// sampler rather than blocking -- this is what makes the pool deadlock-free as long as
    /// every forked handle is eventually reachable by some endpoint through cyclic stealing.
    ///
    /// If the forked task's `compute()` panicked, that panic is resumed here rather than
    /// returning normally.
    pub fn join(&self) -> Result<T::Output, JoinError> {
        let sampler = registry::current().ok_or(JoinError::NotInPool)?;

        let handle = {
            let mut guard = self.state.lock().unwrap();
            let handle = match &*guard {
                ForkState::Pending(_) => return Err(JoinError::NotForked),
                ForkState::Forked(handle) | ForkState::Joined(handle) => handle.clone(),
            };
            // Pool identity is checked before the joined-flag, on every call, so a second
            // `join()` made from the wrong pool is reported as `WrongPool` rather than
            // `AlreadyJoined` -- matching the error precedence documented above.
            if !Arc::ptr_eq(handle.pool(), sampler.pool()) {
                return Err(JoinError::WrongPool);
            }
            if matches!(&*guard, ForkState::Joined(_)) {
                return Err(JoinError::AlreadyJoined);
            }
            *guard = ForkState::Joined(handle.clone());
            handle
        };

        while !handle.is_complete() {
            if let Some(runnable) = sampler.get() {
                runnable.run();
            }
        }

        Ok(handle.take_result())
    }
}

//! The thread-to-pool binding registry.
//!
//! Each OS thread's attachment stack is plain `thread_local!` storage: only the owning
//! thread ever touches its own stack, so no lock or global map is needed at all, and the
//! "does the platform give us fast TLS" question is answered unconditionally yes.

use std::cell::RefCell;
use std::sync::Arc;

use crate::pool::PoolInner;
use crate::runnable::Runnable;
use crate::sampler::Endpoint;

thread_local! {
    static STACK: RefCell<Vec<SamplerHandle>> = RefCell::new(Vec::new());
}

/// A thread's binding to one endpoint of one pool: an `Arc` to the pool (keeping it alive
/// while this thread is attached) plus the index of the endpoint within it.
#[derive(Clone)]
pub(crate) struct SamplerHandle {
    pool: Arc<PoolInner>,
    index: usize,
}

impl SamplerHandle {
    pub(crate) fn new(pool: Arc<PoolInner>, index: usize) -> Self {
        SamplerHandle { pool, index }
    }

    pub(crate) fn add(&self, runnable: Box<dyn Runnable>) {
        self.pool.endpoint(self.index).add(runnable);
    }

    pub(crate) fn get(&self) -> Option<Box<dyn Runnable>> {
        self.pool.endpoint(self.index).get()
    }

    pub(crate) fn pool(&self) -> &Arc<PoolInner> {
        &self.pool
    }
}

/// Pops the top of the calling thread's stack when dropped, so that a panic unwinding
/// through `Pool::invoke` or the worker loop still leaves the registry consistent.
#[must_use]
pub(crate) struct AttachGuard {
    _private: (),
}

impl Drop for AttachGuard {
    fn drop(&mut self) {
        detach();
    }
}

/// Pushes `handle` onto the calling thread's stack; stack depth exceeds one exactly when a
/// thread already attached to one pool re-enters via `invoke` on a second pool.
pub(crate) fn attach(handle: SamplerHandle) -> AttachGuard {
    STACK.with(|stack| stack.borrow_mut().push(handle));
    AttachGuard { _private: () }
}

fn detach() {
    STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// The sampler the calling thread is currently attached to, or `None` if it was called
/// from outside any pool -- the sole signal `fork`/`join` use to raise `NotInPool`.
pub(crate) fn current() -> Option<SamplerHandle> {
    STACK.with(|stack| stack.borrow().last().cloned())
}

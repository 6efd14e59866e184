//! The per-worker runtime loop.

use std::sync::Arc;

use log::debug;

use crate::pool::PoolInner;
use crate::registry;
use crate::registry::SamplerHandle;

/// Registers `index`'s sampler for this OS thread, then loops fetching and running
/// handles until the pool is terminated, finally deregistering. Never calls `fork` or
/// `join` itself -- it only executes the `Runnable`s user task code produces.
pub(crate) fn run(pool: Arc<PoolInner>, index: usize) {
    let handle = SamplerHandle::new(pool.clone(), index);
    let _guard = registry::attach(handle.clone());
    debug!("worker {} started", index);

    loop {
        if pool.is_terminated() {
            break;
        }
        if let Some(runnable) = handle.get() {
            runnable.run();
        }
    }

    debug!("worker {} stopped", index);
}

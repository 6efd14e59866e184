use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_deque::Worker as Deque;
use crossbeam_utils::CachePadded;
use log::info;

use crate::error::PoolError;
use crate::registry;
use crate::sampler::{Endpoint, Sampler};
use crate::single_queue::SingleQueueCore;
use crate::task::Task;
use crate::worker;

/// Default sleep applied on a full steal miss.
const DEFAULT_SLEEP: Duration = Duration::from_millis(1);

/// Which scheduling strategy a [`Pool`] runs. The work-stealing ring is the default and
/// the one this crate is built around; the single-queue strategy is the simpler
/// alternative, traded in wholesale via [`PoolBuilder::strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStrategy {
    /// Per-endpoint deques with cyclic stealing. The default.
    WorkStealing,
    /// One shared deque/injector behind a single lock and condition variable.
    SingleQueue,
}

impl Default for PoolStrategy {
    fn default() -> Self {
        PoolStrategy::WorkStealing
    }
}

/// The pool's shared, internally-owned state.
///
/// `endpoints[0..numWorkers]` are the internal workers' endpoints; `endpoints[numWorkers]`
/// is the external endpoint, shared by every external caller thread concurrently. No
/// endpoint holds a strong reference back to `PoolInner` -- only the short-lived
/// [`SamplerHandle`](crate::registry::SamplerHandle) values threads carry in the registry,
/// and task handles, do -- so there is no `Arc` cycle to worry about (see DESIGN.md
/// for how the cyclic-reference hazard is resolved concretely).
pub(crate) struct PoolInner {
    endpoints: Vec<Arc<dyn Endpoint>>,
    num_workers: usize,
    // Every worker thread polls this flag between handles (worker::run) and every sampler
    // miss reads it indirectly through `is_terminated`; padding it onto its own cache line
    // keeps that read-mostly traffic from bouncing the line `worker_handles` and
    // `num_workers` would otherwise share with it.
    terminated: CachePadded<AtomicBool>,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PoolInner {
    pub(crate) fn endpoint(&self, index: usize) -> &Arc<dyn Endpoint> {
        &self.endpoints[index]
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn external_index(&self) -> usize {
        self.num_workers
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        // Ensures worker threads observe termination even if the caller never called
        // `terminate()` explicitly, so the pool always terminates cleanly on drop.
        self.terminated.store(true, Ordering::Release);
        if let Ok(mut handles) = self.worker_handles.lock() {
            for handle in handles.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

/// A fork-join task pool.
///
/// Construct one with [`Pool::new`], [`Pool::new_default`], or the more flexible
/// [`PoolBuilder`], then submit external work with [`Pool::invoke`]. `Pool` is cheaply
/// cloneable (it is a thin handle around an `Arc`); every clone refers to the same
/// underlying worker threads and endpoints, and the pool is only actually torn down once
/// every clone (and every thread still attached to it) has been dropped.
#[derive(Clone)]
pub struct Pool(Arc<PoolInner>);

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("num_workers", &self.0.num_workers)
            .field("terminated", &self.0.is_terminated())
            .finish()
    }
}

impl Pool {
    /// Builds a work-stealing pool with `num_workers` internal worker threads and the
    /// given post-miss sleep duration. Fails with [`PoolError::InvalidConfig`] if
    /// `num_workers` would overflow the pool's ring indexing.
    pub fn new(num_workers: usize, sleep_duration: Duration) -> Result<Pool, PoolError> {
        PoolBuilder::new()
            .num_workers(num_workers)
            .sleep_duration(sleep_duration)
            .build()
    }

    /// Builds a default work-stealing pool: `num_workers = max(0, cpuCount - 1)` (the
    /// external caller fills the last ring slot) and a ~1ms sleep.
    pub fn new_default() -> Pool {
        PoolBuilder::new()
            .build()
            .expect("default pool configuration is always valid")
    }

    /// Runs `task` synchronously on the calling thread, which is attached to the pool's
    /// shared external endpoint for the duration of the call and becomes a full
    /// participant in stealing and cooperative joins. Fails with
    /// [`PoolError::PoolTerminated`] if [`terminate`](Pool::terminate) was already called.
    ///
    /// This is a direct call, not a `fork`/`join` pair: the caller runs `task.compute()`
    /// itself, so an un-forked `invoke` never touches a deque at all.
    pub fn invoke<T>(&self, task: T) -> Result<T::Output, PoolError>
    where
        T: Task + 'static,
    {
        if self.0.is_terminated() {
            return Err(PoolError::PoolTerminated);
        }
        let handle = registry::SamplerHandle::new(self.0.clone(), self.0.external_index());
        let _guard = registry::attach(handle);
        Ok(task.compute())
    }

    /// Signals termination. Idempotent. Worker threads exit between handles; an `invoke`
    /// already in progress runs to completion, and may keep stealing from internal
    /// endpoints after their workers have exited, so any still-queued work still finishes.
    pub fn terminate(&self) {
        info!("pool termination requested");
        self.0.terminated.store(true, Ordering::Release);
    }

    /// Whether [`terminate`](Pool::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.0.is_terminated()
    }

    /// The number of internal worker threads (not counting the external participant).
    pub fn num_workers(&self) -> usize {
        self.0.num_workers
    }

    #[cfg(test)]
    pub(crate) fn inner_for_test(&self) -> Arc<PoolInner> {
        self.0.clone()
    }
}

/// Builder for [`Pool`], covering the constructor arguments plus the strategy knob.
///
/// The distilled spec's external interface is a pair of positional constructors
/// ([`Pool::new`], [`Pool::new_default`]); this builder is purely configuration
/// ergonomics on top of them, not a new scheduling feature.
pub struct PoolBuilder {
    num_workers: Option<usize>,
    sleep_duration: Duration,
    strategy: PoolStrategy,
}

impl std::fmt::Debug for PoolBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("num_workers", &self.num_workers)
            .field("sleep_duration", &self.sleep_duration)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl PoolBuilder {
    /// A builder with the same defaults as [`Pool::new_default`].
    pub fn new() -> Self {
        PoolBuilder {
            num_workers: None,
            sleep_duration: DEFAULT_SLEEP,
            strategy: PoolStrategy::default(),
        }
    }

    /// Sets the internal worker count. Leaving this unset keeps the default
    /// `max(0, cpuCount - 1)`.
    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = Some(num_workers);
        self
    }

    /// Sets the sleep applied by an endpoint after a full steal/queue miss.
    pub fn sleep_duration(mut self, sleep_duration: Duration) -> Self {
        self.sleep_duration = sleep_duration;
        self
    }

    /// Selects the scheduling strategy. Defaults to [`PoolStrategy::WorkStealing`].
    pub fn strategy(mut self, strategy: PoolStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builds the pool, spawning its worker threads.
    pub fn build(self) -> Result<Pool, PoolError> {
        let num_workers = self
            .num_workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1));
        let total = num_workers
            .checked_add(1)
            .ok_or(PoolError::InvalidConfig)?;

        let endpoints: Vec<Arc<dyn Endpoint>> = match self.strategy {
            PoolStrategy::WorkStealing => {
                let deques: Vec<Deque<Box<dyn crate::runnable::Runnable>>> =
                    (0..total).map(|_| Deque::new_lifo()).collect();
                let stealers: Vec<_> = deques.iter().map(|d| d.stealer()).collect();

                deques
                    .into_iter()
                    .enumerate()
                    .map(|(i, own)| {
                        let others = (1..total)
                            .map(|offset| stealers[(i + offset) % total].clone())
                            .collect();
                        Arc::new(Sampler::new(own, others, self.sleep_duration))
                            as Arc<dyn Endpoint>
                    })
                    .collect()
            }
            PoolStrategy::SingleQueue => {
                let shared: Arc<dyn Endpoint> =
                    Arc::new(SingleQueueCore::new(self.sleep_duration));
                (0..total).map(|_| shared.clone()).collect()
            }
        };

        let inner = Arc::new(PoolInner {
            endpoints,
            num_workers,
            terminated: CachePadded::new(AtomicBool::new(false)),
            worker_handles: Mutex::new(Vec::new()),
        });

        let mut handles = Vec::with_capacity(num_workers);
        for index in 0..num_workers {
            let inner = inner.clone();
            let handle = thread::Builder::new()
                .name(format!("forkjoin-worker-{}", index))
                .spawn(move || worker::run(inner, index))
                .expect("failed to spawn fork-join worker thread");
            handles.push(handle);
        }
        *inner.worker_handles.lock().unwrap() = handles;

        info!(
            "pool constructed with {} worker(s), strategy {:?}",
            num_workers, self.strategy
        );
        Ok(Pool(inner))
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        PoolBuilder::new()
    }
}

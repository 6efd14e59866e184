//! The secondary single-queue scheduling strategy.
//!
//! One shared deque guarded by a lock, with a condition variable for liveness signalling.
//! Every endpoint backed by this strategy shares the same [`SingleQueueCore`], so `add`
//! wakes exactly one waiting `get()` instead of relying on a post-miss sleep. This trades
//! the work-stealing ring's per-endpoint locality and contention-avoidance for a simpler,
//! fully fair FIFO and no polling -- a secondary strategy alongside the work-stealing ring,
//! documented in DESIGN.md.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::runnable::Runnable;
use crate::sampler::Endpoint;

/// Shared core for the single-queue strategy: every endpoint built from [`PoolStrategy::SingleQueue`]
/// is a clone of the same `Arc<SingleQueueCore>`, so there is exactly one queue for the whole pool.
///
/// [`PoolStrategy::SingleQueue`]: crate::PoolStrategy::SingleQueue
pub(crate) struct SingleQueueCore {
    state: Mutex<VecDeque<Box<dyn Runnable>>>,
    available: Condvar,
    sleep_duration: Duration,
}

impl SingleQueueCore {
    pub(crate) fn new(sleep_duration: Duration) -> Self {
        SingleQueueCore {
            state: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            sleep_duration,
        }
    }
}

impl Endpoint for SingleQueueCore {
    fn add(&self, runnable: Box<dyn Runnable>) {
        let mut queue = self.state.lock().unwrap();
        queue.push_back(runnable);
        self.available.notify_one();
    }

    fn get(&self) -> Option<Box<dyn Runnable>> {
        let mut queue = self.state.lock().unwrap();
        if let Some(r) = queue.pop_front() {
            return Some(r);
        }
        let (mut queue, timeout) = self
            .available
            .wait_timeout(queue, self.sleep_duration)
            .unwrap();
        if timeout.timed_out() {
            return None;
        }
        queue.pop_front()
    }
}

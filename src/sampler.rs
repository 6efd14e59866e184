use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crossbeam_deque::{Steal, Stealer, Worker};
use crossbeam_utils::Backoff;
use log::trace;

use crate::runnable::Runnable;

/// A scheduling endpoint: owns one deque, knows how to reach its peers, and decides what
/// to run next. Implemented by both the work-stealing [`Sampler`] and the secondary
/// [`SingleQueueCore`](crate::single_queue::SingleQueueCore) strategy, so that [`Fork`]
/// and the worker runtime need not know which strategy a given [`Pool`] was built with.
///
/// [`Fork`]: crate::Fork
/// [`Pool`]: crate::Pool
pub(crate) trait Endpoint: Send + Sync {
    /// Deposits a handle for asynchronous execution by this endpoint or a peer.
    fn add(&self, runnable: Box<dyn Runnable>);

    /// Local-first-then-steal (or strategy-equivalent) fetch of the next runnable unit of
    /// work. Returns `None` on a full miss after the endpoint's configured idle wait; never
    /// blocks indefinitely.
    fn get(&self) -> Option<Box<dyn Runnable>>;
}

/// A single endpoint in the work-stealing ring.
///
/// The owned deque is wrapped in a `Mutex` rather than moved exclusively into one thread:
/// internal workers never contend on it (each endpoint has exactly one owning thread, so
/// the lock is always uncontended there), but the *external* endpoint is shared
/// by every external caller thread concurrently, and genuinely needs the mutual exclusion.
/// Uniform treatment keeps `Sampler` a single, reusable type for both roles.
pub(crate) struct Sampler {
    own: Mutex<Worker<Box<dyn Runnable>>>,
    /// Peers' stealers, in the fixed cyclic order `i+1, i+2, ..., i+numWorkers mod (numWorkers+1)`.
    others: Vec<Stealer<Box<dyn Runnable>>>,
    sleep_duration: Duration,
}

impl Sampler {
    pub(crate) fn new(
        own: Worker<Box<dyn Runnable>>,
        others: Vec<Stealer<Box<dyn Runnable>>>,
        sleep_duration: Duration,
    ) -> Self {
        Sampler {
            own: Mutex::new(own),
            others,
            sleep_duration,
        }
    }
}

impl Endpoint for Sampler {
    fn add(&self, runnable: Box<dyn Runnable>) {
        self.own.lock().unwrap().push(runnable);
    }

    fn get(&self) -> Option<Box<dyn Runnable>> {
        if let Some(r) = self.own.lock().unwrap().pop() {
            return Some(r);
        }
        for stealer in &self.others {
            let backoff = Backoff::new();
            for _ in 0..MAX_STEAL_RETRIES {
                match stealer.steal() {
                    Steal::Success(r) => return Some(r),
                    Steal::Empty => break,
                    Steal::Retry => backoff.spin(),
                }
            }
        }
        trace!("sampler missed on {} peers, sleeping", self.others.len());
        thread::sleep(self.sleep_duration);
        None
    }
}

/// How many times `get()` retries a single stealer on `Steal::Retry` (a concurrent owner
/// `pop` racing the steal) before moving on to the next peer in cyclic order. Bounds a
/// contended peer to transient delay rather than letting it stall the whole steal pass.
const MAX_STEAL_RETRIES: u32 = 8;

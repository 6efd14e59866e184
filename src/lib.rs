//! A work-stealing fork-join task pool for parallel divide-and-conquer computation.
//!
//! A user task implements [`Task`], forking sub-tasks for asynchronous evaluation by peer
//! workers and joining them to collect results:
//!
//! ```
//! use forkjoin_pool::{Fork, Pool, Task};
//!
//! struct Sum {
//!     range: std::ops::Range<u64>,
//! }
//!
//! const SPLIT: u64 = 1_000;
//!
//! impl Task for Sum {
//!     type Output = u64;
//!
//!     fn compute(&self) -> u64 {
//!         if self.range.end - self.range.start <= SPLIT {
//!             return self.range.clone().sum();
//!         }
//!         let mid = self.range.start + (self.range.end - self.range.start) / 2;
//!         let left = Fork::new(Sum { range: self.range.start..mid });
//!         let right = Sum { range: mid..self.range.end };
//!         left.fork().unwrap();
//!         right.compute() + left.join().unwrap()
//!     }
//! }
//!
//! let pool = Pool::new_default();
//! let total = pool.invoke(Sum { range: 0..10_000 }).unwrap();
//! assert_eq!(total, (0..10_000).sum::<u64>());
//! ```
//!
//! # Architecture
//!
//! Three tightly coupled subsystems, each covered by its own module:
//!
//! - [`sampler`] -- per-endpoint work deques and the cyclic steal order.
//! - [`task`] -- the [`Task`]/[`Fork`] lifecycle and cooperative join protocol.
//! - [`registry`] -- the thread-to-pool binding stack that lets `fork`/`join` find "my
//!   current sampler" without the caller threading one through explicitly.
//!
//! [`pool`] wires these into the public [`Pool`] type and its [`PoolBuilder`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod error;
mod handle;
mod pool;
mod registry;
mod runnable;
mod sampler;
mod single_queue;
mod task;
mod worker;

pub use error::{ForkError, JoinError, PoolError};
pub use pool::{Pool, PoolBuilder, PoolStrategy};
pub use task::{Fork, Task};

//! Integration tests exercising the public `Pool`/`Task` surface end to end, covering the
//! concrete scenarios this pool is expected to satisfy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use forkjoin_pool::{Fork, JoinError, Pool, Task};

/// Enables `trace!`/`debug!` output when these tests are run with `RUST_LOG` set; harmless,
/// idempotent no-op otherwise since a later logger is already installed by a prior test.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SPLIT: u64 = 1_000;

struct Sum {
    start: u64,
    end: u64,
}

impl Task for Sum {
    type Output = u64;

    fn compute(&self) -> u64 {
        if self.end - self.start <= SPLIT {
            return (self.start..self.end).sum();
        }
        let mid = self.start + (self.end - self.start) / 2;
        let left = Fork::new(Sum {
            start: self.start,
            end: mid,
        });
        let right = Sum {
            start: mid,
            end: self.end,
        };
        left.fork().unwrap();
        let right_sum = right.compute();
        let left_sum = left.join().unwrap();
        left_sum + right_sum
    }
}

#[test]
fn sum_of_range_matches_direct_computation() {
    init_logging();
    let pool = Pool::new_default();
    let n = 200_000u64;
    let expected: u64 = (0..n).sum();
    for _ in 0..10 {
        let total = pool.invoke(Sum { start: 0, end: n }).unwrap();
        assert_eq!(total, expected);
    }
}

struct SumWithThreshold {
    start: u64,
    end: u64,
    threshold: u64,
}

impl Task for SumWithThreshold {
    type Output = u64;

    fn compute(&self) -> u64 {
        if self.end - self.start <= self.threshold {
            return (self.start..self.end).sum();
        }
        let mid = self.start + (self.end - self.start) / 2;
        let left = Fork::new(SumWithThreshold {
            start: self.start,
            end: mid,
            threshold: self.threshold,
        });
        let right = SumWithThreshold {
            start: mid,
            end: self.end,
            threshold: self.threshold,
        };
        left.fork().unwrap();
        let right_sum = right.compute();
        left.join().unwrap() + right_sum
    }
}

#[test]
fn sum_result_is_independent_of_split_threshold() {
    // Associativity under split: the same divide-and-conquer
    // task yields the same result regardless of how eagerly it stops splitting.
    let pool = Pool::new_default();
    let n = 50_000u64;
    let expected: u64 = (0..n).sum();
    for threshold in [1, 7, 500, 50_000] {
        let total = pool
            .invoke(SumWithThreshold {
                start: 0,
                end: n,
                threshold,
            })
            .unwrap();
        assert_eq!(total, expected, "threshold {threshold} produced a different result");
    }
}

#[test]
fn sum_of_ten_million_at_literal_scenario_magnitude() {
    // Runs the "sum of 0..10_000_000, split threshold 100_000, 25 iterations" scenario at
    // its literal scale: deep enough fork trees, and enough of them, to exercise sustained
    // steal pressure well beyond `num_workers` rather than the smaller sizes the other tests
    // here use to keep the suite fast.
    init_logging();
    let pool = Pool::new_default();
    let n = 10_000_000u64;
    let expected = 49_999_995_000_000u64;
    for _ in 0..25 {
        let total = pool
            .invoke(SumWithThreshold {
                start: 0,
                end: n,
                threshold: 100_000,
            })
            .unwrap();
        assert_eq!(total, expected);
    }
}

struct IncrementCounters {
    counters: Arc<Vec<AtomicU64>>,
    start: usize,
    end: usize,
}

const COUNTER_SPLIT: usize = 1_000;

impl Task for IncrementCounters {
    type Output = ();

    fn compute(&self) {
        if self.end - self.start <= COUNTER_SPLIT {
            for counter in &self.counters[self.start..self.end] {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }
        let mid = self.start + (self.end - self.start) / 2;
        let left = Fork::new(IncrementCounters {
            counters: self.counters.clone(),
            start: self.start,
            end: mid,
        });
        let right = IncrementCounters {
            counters: self.counters.clone(),
            start: mid,
            end: self.end,
        };
        left.fork().unwrap();
        right.compute();
        left.join().unwrap();
    }
}

#[test]
fn concurrency_safe_counters_reach_exact_count() {
    // The literal scenario is 10_000_000 counters over 10 iterations; this runs at 1/50th
    // that element count (still well beyond `num_workers` deep in the fork tree) to keep
    // the suite fast, since `sum_of_ten_million_at_literal_scenario_magnitude` above already
    // exercises the full literal scale for sustained steal pressure.
    let counters: Arc<Vec<AtomicU64>> = Arc::new((0..200_000).map(|_| AtomicU64::new(0)).collect());
    let pool = Pool::new_default();
    let iterations = 5u64;
    for _ in 0..iterations {
        pool.invoke(IncrementCounters {
            counters: counters.clone(),
            start: 0,
            end: counters.len(),
        })
        .unwrap();
    }
    for counter in counters.iter() {
        assert_eq!(counter.load(Ordering::Relaxed), iterations);
    }
}

#[test]
fn double_fork_is_rejected() {
    struct JustForks;
    impl Task for JustForks {
        type Output = forkjoin_pool::ForkError;
        fn compute(&self) -> forkjoin_pool::ForkError {
            struct Leaf;
            impl Task for Leaf {
                type Output = ();
                fn compute(&self) {}
            }
            let fork = Fork::new(Leaf);
            fork.fork().unwrap();
            let err = fork.fork().unwrap_err();
            fork.join().unwrap();
            err
        }
    }

    let pool = Pool::new(2, Duration::from_millis(1)).unwrap();
    let err = pool.invoke(JustForks).unwrap();
    assert_eq!(err, forkjoin_pool::ForkError::AlreadyForked);
}

#[test]
fn cross_pool_join_is_rejected() {
    let pool_a = Pool::new(1, Duration::from_millis(1)).unwrap();
    let pool_b = Pool::new(1, Duration::from_millis(1)).unwrap();

    struct Leaf;
    impl Task for Leaf {
        type Output = ();
        fn compute(&self) {}
    }

    // Fork inside pool A, hand the still-live `Fork` out, then try to join it while only
    // attached to pool B.
    let fork: Arc<Fork<Leaf>> = Arc::new(Fork::new(Leaf));
    {
        let fork = fork.clone();
        struct ForkOnly(Arc<Fork<Leaf>>);
        impl Task for ForkOnly {
            type Output = ();
            fn compute(&self) {
                self.0.fork().unwrap();
            }
        }
        pool_a.invoke(ForkOnly(fork)).unwrap();
    }

    struct JoinOnly(Arc<Fork<Leaf>>);
    impl Task for JoinOnly {
        type Output = Result<(), JoinError>;
        fn compute(&self) -> Result<(), JoinError> {
            self.0.join()
        }
    }
    let result = pool_b.invoke(JoinOnly(fork)).unwrap();
    assert_eq!(result.unwrap_err(), JoinError::WrongPool);
}

#[test]
fn terminate_mid_computation_does_not_affect_in_flight_invoke() {
    init_logging();
    let pool = Pool::new(4, Duration::from_millis(1)).unwrap();
    let n = 2_000_000u64;
    let expected: u64 = (0..n).sum();

    let pool_for_invoke = pool.clone();
    let start_barrier = Arc::new(Barrier::new(2));
    let invoke_barrier = start_barrier.clone();

    let worker = std::thread::spawn(move || {
        invoke_barrier.wait();
        pool_for_invoke.invoke(Sum { start: 0, end: n }).unwrap()
    });

    start_barrier.wait();
    std::thread::sleep(Duration::from_micros(50));
    pool.terminate();

    let result = worker.join().unwrap();
    assert_eq!(result, expected);
}

#[test]
fn nested_invoke_reaches_inner_pool_and_restores_outer_attachment() {
    struct Inner;
    impl Task for Inner {
        type Output = u64;
        fn compute(&self) -> u64 {
            21
        }
    }

    struct Outer;
    impl Task for Outer {
        type Output = u64;
        fn compute(&self) -> u64 {
            let inner_pool = Pool::new(1, Duration::from_millis(1)).unwrap();
            let inner_result = inner_pool.invoke(Inner).unwrap();
            inner_pool.terminate();

            let fork = Fork::new(Double(inner_result));
            fork.fork().unwrap();
            fork.join().unwrap()
        }
    }

    struct Double(u64);
    impl Task for Double {
        type Output = u64;
        fn compute(&self) -> u64 {
            self.0 * 2
        }
    }

    let outer_pool = Pool::new(2, Duration::from_millis(1)).unwrap();
    let result = outer_pool.invoke(Outer).unwrap();
    assert_eq!(result, 42);
}

#[test]
fn zero_workers_pool_still_honors_fork_join() {
    let pool = Pool::new(0, Duration::from_millis(1)).unwrap();
    let total = pool.invoke(Sum { start: 0, end: 10_000 }).unwrap();
    assert_eq!(total, (0..10_000u64).sum::<u64>());
}

//! # Worker Module
//!
//! Bounded, per-stage parallel execution.
//!
//! ## How a stage runs
//! 1. A [`WorkerPool`] with exactly `workers` threads is built for the stage.
//! 2. The calling thread spawns one task per [`JobItem`] into the pool.
//! 3. Each task reports `Result<T, ItemError>` over a channel; a panic inside
//!    a task is caught and reported as [`ItemError::Panicked`].
//! 4. The calling thread drains the channel, advancing the progress registry
//!    as items finish, and returns once every dispatched item has reported.
//! 5. The pool is dropped with the [`StageRun`], before the next stage starts.
//!
//! Cancellation is checked when a task is picked up, never mid-item: items
//! that had not started when the token fired are counted as skipped.

use crate::core::scanner::JobItem;
use crate::error::{ItemError, SetupError};
use crate::progress::RunContext;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A recorded per-item failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub message: String,
}

impl From<&ItemError> for ItemFailure {
    fn from(error: &ItemError) -> Self {
        Self {
            path: error.path().clone(),
            message: error.to_string(),
        }
    }
}

/// What one stage produced, in input order
#[derive(Debug)]
pub struct StageRun<T> {
    /// Items that succeeded, with their outcome
    pub outcomes: Vec<(JobItem, T)>,
    /// Items that failed
    pub failures: Vec<ItemFailure>,
    /// Items never started because the run was cancelled
    pub skipped: usize,
    /// Number of items listed for the stage
    pub total: usize,
    pub elapsed: Duration,
}

impl<T> StageRun<T> {
    /// Items that finished, successfully or not
    pub fn processed(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }
}

enum Report<T> {
    Done(Result<T, ItemError>),
    Skipped,
}

/// A fixed-size rayon pool that lives for one stage
pub struct WorkerPool {
    workers: usize,
    pool: ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `workers` threads (at least one)
    pub fn new(workers: usize) -> Result<Self, SetupError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("sieve-worker-{index}"))
            .build()
            .map_err(|e| SetupError::WorkerPool {
                workers,
                reason: e.to_string(),
            })?;
        Ok(Self { workers, pool })
    }

    /// Run `task` over every item and wait for all of them.
    ///
    /// Resets the progress registry to `task_name` / `items.len()` first.
    pub fn run<T, F>(
        &self,
        task_name: &str,
        items: Vec<JobItem>,
        ctx: &RunContext,
        task: F,
    ) -> StageRun<T>
    where
        T: Send,
        F: Fn(&JobItem) -> Result<T, ItemError> + Sync,
    {
        let start = Instant::now();
        let total = items.len();
        ctx.progress.begin(task_name, total);
        info!(stage = task_name, total, workers = self.workers, "stage started");

        let mut results: Vec<Option<Result<T, ItemError>>> = (0..total).map(|_| None).collect();
        let (sender, receiver) = crossbeam_channel::unbounded::<(usize, Report<T>)>();
        let task = &task;
        let items_ref = &items;

        self.pool.in_place_scope(|scope| {
            for (index, item) in items_ref.iter().enumerate() {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let report = if ctx.cancel.is_cancelled() {
                        Report::Skipped
                    } else {
                        Report::Done(run_isolated(task, item))
                    };
                    // The receiver outlives the scope
                    let _ = sender.send((index, report));
                });
            }
            drop(sender);

            for (index, report) in receiver.iter().take(total) {
                let item = &items_ref[index];
                match report {
                    Report::Done(Ok(outcome)) => {
                        debug!(stage = task_name, file = %item.name, "item done");
                        ctx.progress.complete(&item.name);
                        results[index] = Some(Ok(outcome));
                    }
                    Report::Done(Err(error)) => {
                        warn!(stage = task_name, file = %item.name, error = %error, "item failed");
                        ctx.progress.complete(&item.name);
                        results[index] = Some(Err(error));
                    }
                    Report::Skipped => {}
                }
            }
        });

        let mut run = StageRun {
            outcomes: Vec::new(),
            failures: Vec::new(),
            skipped: 0,
            total,
            elapsed: Duration::ZERO,
        };
        for (item, result) in items.into_iter().zip(results) {
            match result {
                Some(Ok(outcome)) => run.outcomes.push((item, outcome)),
                Some(Err(error)) => run.failures.push(ItemFailure::from(&error)),
                None => run.skipped += 1,
            }
        }
        run.elapsed = start.elapsed();

        info!(
            stage = task_name,
            succeeded = run.outcomes.len(),
            failed = run.failures.len(),
            skipped = run.skipped,
            elapsed_ms = run.elapsed.as_millis() as u64,
            "stage finished"
        );
        run
    }
}

fn run_isolated<T, F>(task: &F, item: &JobItem) -> Result<T, ItemError>
where
    F: Fn(&JobItem) -> Result<T, ItemError>,
{
    panic::catch_unwind(AssertUnwindSafe(|| task(item))).unwrap_or_else(|payload| {
        Err(ItemError::Panicked {
            path: item.path.clone(),
            reason: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;

    fn items(count: usize) -> Vec<JobItem> {
        (0..count)
            .map(|i| JobItem {
                path: PathBuf::from(format!("/virtual/{i}.jpg")),
                name: format!("{i}.jpg"),
                size: i as u64,
            })
            .collect()
    }

    #[test]
    fn zero_workers_still_gets_one_thread() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.pool.current_num_threads(), 1);
    }

    #[test]
    fn run_collects_outcomes_in_input_order() {
        let ctx = RunContext::new();
        let pool = WorkerPool::new(4).unwrap();

        let run = pool.run("double", items(20), &ctx, |item| Ok(item.size * 2));

        assert_eq!(run.total, 20);
        assert_eq!(run.outcomes.len(), 20);
        for (i, (item, doubled)) in run.outcomes.iter().enumerate() {
            assert_eq!(item.size, i as u64);
            assert_eq!(*doubled, i as u64 * 2);
        }
    }

    #[test]
    fn failures_are_isolated_per_item() {
        let ctx = RunContext::new();
        let pool = WorkerPool::new(3).unwrap();

        let run = pool.run("odd fails", items(10), &ctx, |item| {
            if item.size % 2 == 1 {
                Err(ItemError::Decode {
                    path: item.path.clone(),
                    reason: "odd".to_string(),
                })
            } else {
                Ok(())
            }
        });

        assert_eq!(run.outcomes.len(), 5);
        assert_eq!(run.failures.len(), 5);
        assert_eq!(run.processed(), 10);
        assert!(run.failures[0].message.contains("odd"));
    }

    #[test]
    fn panics_become_item_errors() {
        let ctx = RunContext::new();
        let pool = WorkerPool::new(2).unwrap();

        let run = pool.run("panicky", items(4), &ctx, |item| {
            if item.size == 2 {
                panic!("boom on {}", item.name);
            }
            Ok(())
        });

        assert_eq!(run.outcomes.len(), 3);
        assert_eq!(run.failures.len(), 1);
        assert!(run.failures[0].message.contains("boom on 2.jpg"));
    }

    #[test]
    fn progress_reaches_total_after_stage() {
        let ctx = RunContext::new();
        let pool = WorkerPool::new(2).unwrap();

        pool.run("count", items(7), &ctx, |_| Ok(()));

        let snapshot = ctx.progress.snapshot();
        assert_eq!(snapshot.current_task, "count");
        assert_eq!(snapshot.total_jobs, 7);
        assert_eq!(snapshot.processed, 7);
    }

    #[test]
    fn concurrency_never_exceeds_worker_count() {
        let ctx = RunContext::new();
        let pool = WorkerPool::new(2).unwrap();
        let active = AtomicUsize::new(0);
        let peak = Mutex::new(0usize);

        pool.run("bounded", items(12), &ctx, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut peak = peak.lock().unwrap();
                *peak = (*peak).max(now);
            }
            thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(*peak.lock().unwrap() <= 2);
    }

    #[test]
    fn cancelled_run_skips_unstarted_items() {
        let ctx = RunContext::new();
        ctx.cancel.cancel();
        let pool = WorkerPool::new(2).unwrap();

        let run = pool.run("cancelled", items(5), &ctx, |_| Ok(()));

        assert_eq!(run.skipped, 5);
        assert!(run.outcomes.is_empty());
        assert_eq!(ctx.progress.snapshot().processed, 0);
    }
}

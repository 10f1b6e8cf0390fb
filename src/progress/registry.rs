//! The progress registry and its snapshot type.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Label shown for `current_job` when no item has completed yet
pub const IDLE_JOB: &str = "idle";

/// A point-in-time copy of the registry, safe to hand to any UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Name of the running stage (e.g. "clear duplicate")
    pub current_task: String,
    /// Number of items the stage will process
    pub total_jobs: usize,
    /// Number of items finished so far, success or failure
    pub processed: usize,
    /// Label of the most recently finished item
    pub current_job: String,
}

impl ProgressSnapshot {
    /// True once every item of the stage has been processed
    pub fn is_complete(&self) -> bool {
        self.processed == self.total_jobs
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            current_task: String::new(),
            total_jobs: 0,
            processed: 0,
            current_job: IDLE_JOB.to_string(),
        }
    }
}

#[derive(Debug)]
struct Labels {
    current_task: String,
    current_job: String,
}

/// Progress state shared between the stage dispatcher and pollers.
///
/// Counters are atomics so readers never wait on a writer. The two labels
/// sit behind a mutex that is only held long enough to copy a string.
#[derive(Debug)]
pub struct ProgressRegistry {
    total_jobs: AtomicUsize,
    processed: AtomicUsize,
    labels: Mutex<Labels>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self {
            total_jobs: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            labels: Mutex::new(Labels {
                current_task: String::new(),
                current_job: IDLE_JOB.to_string(),
            }),
        }
    }

    fn labels(&self) -> MutexGuard<'_, Labels> {
        // A panicking writer cannot leave two strings in a torn state
        self.labels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Zero every field. Called once at the start of each stage.
    pub fn reset(&self) {
        self.processed.store(0, Ordering::SeqCst);
        self.total_jobs.store(0, Ordering::SeqCst);
        let mut labels = self.labels();
        labels.current_task.clear();
        labels.current_job = IDLE_JOB.to_string();
    }

    pub fn set_current_task(&self, name: &str) {
        self.labels().current_task = name.to_string();
    }

    pub fn set_total(&self, total: usize) {
        self.total_jobs.store(total, Ordering::SeqCst);
    }

    /// Reset and announce a new stage in one call
    pub fn begin(&self, task: &str, total: usize) {
        self.reset();
        self.set_current_task(task);
        self.set_total(total);
    }

    /// Mark one item finished and label it as the current job.
    ///
    /// Saturates at `total_jobs`; returns the new processed count.
    pub fn complete(&self, label: &str) -> usize {
        let total = self.total_jobs.load(Ordering::SeqCst);
        let processed = match self.processed.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| {
            (p < total).then_some(p + 1)
        }) {
            Ok(previous) => previous + 1,
            Err(current) => current,
        };
        self.labels().current_job = label.to_string();
        processed
    }

    /// Update only the label (for stages whose unit of work is not an item)
    pub fn set_current_job(&self, label: &str) {
        self.labels().current_job = label.to_string();
    }

    /// Copy out the current state.
    ///
    /// `total_jobs` is read before `processed` and the latter is clamped, so a
    /// snapshot taken across a concurrent reset never reports more processed
    /// items than jobs.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let total_jobs = self.total_jobs.load(Ordering::SeqCst);
        let processed = self.processed.load(Ordering::SeqCst).min(total_jobs);
        let labels = self.labels();
        ProgressSnapshot {
            current_task: labels.current_task.clone(),
            total_jobs,
            processed,
            current_job: labels.current_job.clone(),
        }
    }
}

impl Default for ProgressRegistry {
    fn default() -> Self {
        Self::new()
    }
}

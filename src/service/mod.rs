//! # Service Module
//!
//! Job submission and polling API for front ends.
//!
//! A [`Service`] owns one [`RunContext`] and runs at most one job at a
//! time. A front end submits a job (usually on a background thread via
//! [`Service::spawn_filter`]) and polls [`Service::get_processing`] and
//! [`Service::get_result`] about every 100 ms until the job finishes.
//!
//! ```rust,ignore
//! let service = Service::new();
//! let handle = service.spawn_filter(request);
//! while service.get_processing() || !handle.is_finished() {
//!     let snapshot = service.get_result();
//!     println!("{}: {}/{}", snapshot.current_task, snapshot.processed, snapshot.total_jobs);
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! let report = handle.join().unwrap();
//! ```

use crate::config::{
    default_cache_dir, default_output_dir, parse_worker_count, RunConfig, StageFlags,
    DEFAULT_QUALITY_BOUNDARY_KB,
};
use crate::core::files::{delete_dirs, extract_files, merge_dirs, DeleteReport, ExtractReport, MergeReport};
use crate::core::pipeline::{Pipeline, DEFAULT_GRACE_PERIOD};
use crate::core::report::RunReport;
use crate::error::{ConfigError, SieveError};
use crate::progress::{ProgressSnapshot, RunContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// A filter job as submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRequest {
    pub source: PathBuf,
    /// Defaults to the platform cache directory
    pub cache_dir: Option<PathBuf>,
    /// Defaults to `./filter`
    pub output_dir: Option<PathBuf>,
    /// Worker count exactly as typed by the user
    pub workers: String,
    /// Defaults to 500 KB
    pub quality_boundary_kb: Option<u64>,
    pub flags: StageFlags,
}

impl FilterRequest {
    /// Parse and validate into a run configuration
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let config = RunConfig {
            workers: parse_worker_count(&self.workers)?,
            source: self.source,
            cache_dir: self.cache_dir.unwrap_or_else(default_cache_dir),
            output_dir: self.output_dir.unwrap_or_else(default_output_dir),
            quality_boundary_kb: self.quality_boundary_kb.unwrap_or(DEFAULT_QUALITY_BOUNDARY_KB),
            flags: self.flags,
        };
        config.validate()?;
        Ok(config)
    }
}

struct Inner {
    ctx: RunContext,
    run_lock: Mutex<()>,
    last_report: Mutex<Option<RunReport>>,
    grace_period: Duration,
}

/// Shared handle to the job runner. Clones refer to the same state.
#[derive(Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

impl Service {
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    /// A service whose filter runs wait `grace_period` before clearing the
    /// processing flag
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx: RunContext::new(),
                run_lock: Mutex::new(()),
                last_report: Mutex::new(None),
                grace_period,
            }),
        }
    }

    /// Run a filter job to completion on the calling thread.
    ///
    /// Never fails: invalid input, a busy service and setup errors all come
    /// back as a report with `error` set and no stages.
    pub fn start_filter(&self, request: FilterRequest) -> RunReport {
        let config = match request.into_config() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "rejected filter request");
                return self.record(RunReport::failed(e.to_string()));
            }
        };

        let _guard = match self.try_acquire() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "filter request while busy");
                return RunReport::failed(e.to_string());
            }
        };

        self.inner.ctx.cancel.reset();
        let report = Pipeline::builder()
            .config(config)
            .grace_period(self.inner.grace_period)
            .build()
            .and_then(|pipeline| pipeline.run(&self.inner.ctx))
            .unwrap_or_else(|e| RunReport::failed(e.to_string()));

        self.record(report)
    }

    /// Run a filter job on a background thread
    pub fn spawn_filter(&self, request: FilterRequest) -> JoinHandle<RunReport> {
        let service = self.clone();
        thread::spawn(move || service.start_filter(request))
    }

    /// Merge two directory trees into `dst`
    pub fn start_merge(&self, first: &Path, second: &Path, dst: &Path) -> Result<MergeReport, SieveError> {
        self.exclusive("merge", |ctx| Ok(merge_dirs(first, second, dst, &ctx.progress)?))
    }

    /// Flatten `src` into `dst` (or `dst/target_subdir`)
    pub fn start_extract(
        &self,
        src: &Path,
        dst: &Path,
        target_subdir: Option<&str>,
    ) -> Result<ExtractReport, SieveError> {
        self.exclusive("extract", |_| Ok(extract_files(src, dst, target_subdir)?))
    }

    /// Remove subdirectories of `target`
    pub fn start_delete(&self, target: &Path, only_empty: bool) -> Result<DeleteReport, SieveError> {
        self.exclusive("delete", |_| Ok(delete_dirs(target, only_empty)?))
    }

    /// Ask the running job to stop after the items already started
    pub fn cancel(&self) {
        info!("cancellation requested");
        self.inner.ctx.cancel.cancel();
    }

    /// Whether a job is running
    pub fn get_processing(&self) -> bool {
        self.inner.ctx.is_processing()
    }

    /// Current progress
    pub fn get_result(&self) -> ProgressSnapshot {
        self.inner.ctx.progress.snapshot()
    }

    /// Report of the most recent filter run
    pub fn last_report(&self) -> Option<RunReport> {
        lock(&self.inner.last_report).clone()
    }

    fn try_acquire(&self) -> Result<MutexGuard<'_, ()>, ConfigError> {
        match self.inner.run_lock.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(ConfigError::Busy),
        }
    }

    /// Run a directory utility with the service marked busy
    fn exclusive<T, F>(&self, task: &str, job: F) -> Result<T, SieveError>
    where
        F: FnOnce(&RunContext) -> Result<T, SieveError>,
    {
        let _guard = self.try_acquire()?;
        let ctx = &self.inner.ctx;
        let _processing = ctx.begin_processing();
        ctx.progress.reset();
        ctx.progress.begin(task, 0);

        let result = job(ctx);
        if let Err(e) = &result {
            warn!(task, error = %e, "job failed");
        }
        result
    }

    fn record(&self, report: RunReport) -> RunReport {
        *lock(&self.inner.last_report) = Some(report.clone());
        report
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

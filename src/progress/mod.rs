//! # Progress Module
//!
//! Pollable progress state for a run.
//!
//! ## Design
//! The core never pushes progress anywhere. Each stage resets the
//! [`ProgressRegistry`] when it starts and advances it as items complete;
//! a UI or CLI polls [`ProgressRegistry::snapshot`] on a fixed interval
//! (100ms is plenty).
//!
//! All per-run shared state lives in a [`RunContext`] that callers create
//! and pass to the pipeline, instead of process-wide globals.
//!
//! ## Example
//! ```rust,ignore
//! let ctx = Arc::new(RunContext::new());
//! let worker_ctx = ctx.clone();
//! std::thread::spawn(move || pipeline.run(&worker_ctx));
//!
//! while ctx.is_processing() {
//!     let p = ctx.progress.snapshot();
//!     println!("[{}] {}/{} {}", p.current_task, p.processed, p.total_jobs, p.current_job);
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! ```

mod context;
mod registry;

pub use context::{CancellationToken, RunContext};
pub use registry::{ProgressRegistry, ProgressSnapshot, IDLE_JOB};

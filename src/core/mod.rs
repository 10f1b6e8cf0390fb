//! # Core Module
//!
//! The UI-agnostic filtering engine.
//!
//! ## Modules
//! - `scanner` - Lists the files a stage works on
//! - `worker` - Runs one stage's files on a bounded thread pool
//! - `hasher` - Computes whole-file content hashes
//! - `dedup` - Deletes content-identical copies
//! - `classify` - Re-encodes images into JPEG or PNG, split by format
//! - `quality` - Splits files into size tiers
//! - `reclaim` - Deletes leftover cache files
//! - `files` - Merge, extract, prune and move helpers
//! - `pipeline` - Orchestrates the full workflow
//! - `report` - Stage and run reports

pub mod classify;
pub mod dedup;
pub mod files;
pub mod hasher;
pub mod pipeline;
pub mod quality;
pub mod reclaim;
pub mod report;
pub mod scanner;
pub mod worker;

// Re-export commonly used types
pub use classify::{CanonicalFormat, FormatClassifier};
pub use dedup::Deduplicator;
pub use pipeline::{plan_stages, Pipeline, PipelineBuilder};
pub use quality::{QualitySplitter, Tier};
pub use reclaim::CacheReclaimer;
pub use report::{RunReport, StageDetails, StageKind, StageReport};
pub use scanner::JobItem;

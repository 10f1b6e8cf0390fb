//! # Pipeline Module
//!
//! Orchestrates a full filter run.
//!
//! ## Pipeline Stages
//! 1. **Separate** - re-encode into `{cache}/{JPEG,PNG}`, or copy the
//!    source into `{cache}/tmp`
//! 2. **Deduplicate** - per working directory
//! 3. **Split** - move into `QUALITY` / `LOW` tiers, or straight to output
//! 4. **Clean** - delete cache artifacts and prune empty cache directories
//!
//! ## Parallelism
//! Stages run one after another. Inside a stage, files are processed on a
//! bounded rayon pool built for that stage alone.

mod executor;
mod plan;

pub use executor::{Pipeline, PipelineBuilder, DEFAULT_GRACE_PERIOD};
pub use plan::{cache_artifact_dirs, plan_stages, working_dirs, WorkingDir, UNSORTED_DIR};

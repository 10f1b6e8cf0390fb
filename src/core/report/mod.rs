//! # Report Module
//!
//! Per-stage and per-run results.
//!
//! Every stage folds its [`StageRun`] into a [`StageReport`]; the
//! orchestrator collects them into a [`RunReport`]. All types serialize to
//! JSON so a UI can render them directly.

use crate::core::worker::{ItemFailure, StageRun};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Re-encode into canonical formats, split by format
    FormatSeparation,
    /// Plain copy of the source into the cache (when format separation is off)
    SourceCopy,
    /// Remove content-identical copies
    Deduplication,
    /// Split into size tiers
    QualitySeparation,
    /// Plain move from the cache into the output (when quality separation is off)
    MoveToOutput,
    /// Delete cache artifacts
    CacheCleanup,
    /// Remove empty cache directories
    PruneCache,
}

impl StageKind {
    /// Task name shown in the progress registry
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::FormatSeparation => "separate mode",
            StageKind::SourceCopy => "copy source",
            StageKind::Deduplication => "clear duplicate",
            StageKind::QualitySeparation => "separate quality",
            StageKind::MoveToOutput => "move output",
            StageKind::CacheCleanup => "clear cache",
            StageKind::PruneCache => "prune cache",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Stage-specific counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageDetails {
    #[default]
    None,
    Formats { jpeg: usize, png: usize },
    Dedup { removed_count: usize, distinct_hashes: usize },
    Tiers { high: usize, low: usize },
    Reclaim { removed_count: usize, total_size: u64 },
    Transfer { files: usize },
    Prune { removed_dirs: usize },
}

/// Result of one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    /// Directory the stage read from
    pub directory: PathBuf,
    pub cost_time: Duration,
    /// Items listed
    pub total: usize,
    /// Items finished, success or failure
    pub processed: usize,
    pub failed: usize,
    /// Items not started because the run was cancelled
    pub skipped: usize,
    pub details: StageDetails,
    pub errors: Vec<ItemFailure>,
}

impl StageReport {
    /// Fold a worker-pool run into a report
    pub fn from_run<T>(
        stage: StageKind,
        directory: &Path,
        run: &StageRun<T>,
        details: StageDetails,
    ) -> Self {
        Self {
            stage,
            directory: directory.to_path_buf(),
            cost_time: run.elapsed,
            total: run.total,
            processed: run.processed(),
            failed: run.failures.len(),
            skipped: run.skipped,
            details,
            errors: run.failures.clone(),
        }
    }

    /// Report for a stage with nothing to do (e.g. a working directory an
    /// earlier stage never created)
    pub fn empty(stage: StageKind, directory: &Path) -> Self {
        Self {
            stage,
            directory: directory.to_path_buf(),
            cost_time: Duration::ZERO,
            total: 0,
            processed: 0,
            failed: 0,
            skipped: 0,
            details: StageDetails::None,
            errors: Vec::new(),
        }
    }

    /// Files deleted by this stage (duplicates or cache artifacts)
    pub fn removed_count(&self) -> Option<usize> {
        match self.details {
            StageDetails::Dedup { removed_count, .. }
            | StageDetails::Reclaim { removed_count, .. } => Some(removed_count),
            _ => None,
        }
    }

    /// Bytes reclaimed by this stage
    pub fn total_size(&self) -> Option<u64> {
        match self.details {
            StageDetails::Reclaim { total_size, .. } => Some(total_size),
            _ => None,
        }
    }
}

/// Aggregate result of one filter run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub cost_time: Duration,
    pub stages: Vec<StageReport>,
    /// True if the run stopped early on a cancellation request
    pub cancelled: bool,
    /// Set when the run could not start or aborted on a setup error
    pub error: Option<String>,
}

impl RunReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            cost_time: Duration::ZERO,
            stages: Vec::new(),
            cancelled: false,
            error: None,
        }
    }

    /// A report for a run that never got going
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(Utc::now())
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Duplicates removed across every deduplication stage
    pub fn duplicates_removed(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.stage == StageKind::Deduplication)
            .filter_map(StageReport::removed_count)
            .sum()
    }

    /// Bytes reclaimed by cache cleanup
    pub fn reclaimed_bytes(&self) -> u64 {
        self.stages.iter().filter_map(StageReport::total_size).sum()
    }

    /// Per-item failures across all stages
    pub fn error_count(&self) -> usize {
        self.stages.iter().map(|s| s.failed).sum()
    }

    /// Reports for one kind of stage
    pub fn stages_of(&self, kind: StageKind) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(move |s| s.stage == kind)
    }
}

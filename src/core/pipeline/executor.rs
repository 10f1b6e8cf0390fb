//! Pipeline execution implementation.

use super::plan::{cache_artifact_dirs, plan_stages, working_dirs, WorkingDir, UNSORTED_DIR};
use crate::config::{RunConfig, StageFlags};
use crate::core::classify::FormatClassifier;
use crate::core::dedup::Deduplicator;
use crate::core::files::{copy_tree, delete_dirs, move_into_unique, move_path};
use crate::core::quality::QualitySplitter;
use crate::core::reclaim::CacheReclaimer;
use crate::core::report::{RunReport, StageDetails, StageKind, StageReport};
use crate::core::scanner::{list_files, list_subdirs};
use crate::core::worker::{ItemFailure, WorkerPool};
use crate::error::{ItemError, SetupError, SieveError};
use crate::progress::RunContext;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Pause before clearing the processing flag, so a poller sees the final
/// progress update
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: RunConfig,
    grace_period: Duration,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Start from a complete configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the directory holding the images to sort
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    /// Set the working directory for intermediate results
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = cache_dir.into();
        self
    }

    /// Set the output root
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    /// Set the number of worker threads per stage
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the tier boundary in kilobytes
    pub fn quality_boundary_kb(mut self, boundary_kb: u64) -> Self {
        self.config.quality_boundary_kb = boundary_kb;
        self
    }

    /// Set which stages run
    pub fn flags(mut self, flags: StageFlags) -> Self {
        self.config.flags = flags;
        self
    }

    /// Set the pause before the processing flag is cleared
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Validate and build the pipeline
    pub fn build(self) -> Result<Pipeline, SieveError> {
        self.config.validate()?;
        Ok(Pipeline {
            config: self.config,
            grace_period: self.grace_period,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The filter pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: RunConfig,
    grace_period: Duration,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The stages this pipeline will run, in order
    pub fn plan(&self) -> Vec<StageKind> {
        plan_stages(&self.config.flags)
    }

    /// Run every planned stage.
    ///
    /// Marks the context as processing for the whole run. Per-file failures
    /// end up in the stage reports; only errors that stop a stage from
    /// starting are returned as `Err`.
    pub fn run(&self, ctx: &RunContext) -> Result<RunReport, SieveError> {
        let _processing = ctx.begin_processing();
        ctx.progress.reset();

        let result = self.execute(ctx);
        if let Err(e) = &result {
            error!(error = %e, "filter run aborted");
        }

        if !self.grace_period.is_zero() {
            thread::sleep(self.grace_period);
        }
        result
    }

    fn execute(&self, ctx: &RunContext) -> Result<RunReport, SieveError> {
        let start = Instant::now();
        let config = &self.config;
        let mut report = RunReport::new(Utc::now());

        if !config.source.exists() {
            return Err(SetupError::DirectoryNotFound {
                path: config.source.clone(),
            }
            .into());
        }
        if !config.source.is_dir() {
            return Err(SetupError::NotADirectory {
                path: config.source.clone(),
            }
            .into());
        }
        fs::create_dir_all(&config.cache_dir).map_err(|source| SetupError::CreateDirectory {
            path: config.cache_dir.clone(),
            source,
        })?;

        let plan = self.plan();
        let dirs = working_dirs(&config.cache_dir, &config.output_dir, config.flags.by_mode);
        info!(
            run_id = %report.run_id,
            source = %config.source.display(),
            workers = config.workers,
            stages = ?plan,
            "filter run started"
        );

        for stage in plan {
            if ctx.cancel.is_cancelled() {
                warn!(stage = %stage, "run cancelled before stage");
                report.cancelled = true;
                break;
            }
            let stage_reports = self.run_stage(stage, &dirs, ctx)?;
            report.stages.extend(stage_reports);
        }

        report.cancelled |= ctx.cancel.is_cancelled() || report.stages.iter().any(|s| s.skipped > 0);
        report.cost_time = start.elapsed();
        info!(
            run_id = %report.run_id,
            removed_count = report.duplicates_removed(),
            reclaimed_bytes = report.reclaimed_bytes(),
            errors = report.error_count(),
            cancelled = report.cancelled,
            elapsed_ms = report.cost_time.as_millis() as u64,
            "filter run finished"
        );
        Ok(report)
    }

    fn run_stage(
        &self,
        stage: StageKind,
        dirs: &[WorkingDir],
        ctx: &RunContext,
    ) -> Result<Vec<StageReport>, SieveError> {
        let config = &self.config;
        let reports = match stage {
            StageKind::FormatSeparation => vec![FormatClassifier::new(config.workers).run(
                &config.source,
                &config.cache_dir,
                ctx,
            )?],
            StageKind::SourceCopy => vec![self.copy_source(ctx)?],
            StageKind::Deduplication => {
                let dedup = Deduplicator::new(config.workers);
                per_working_dir(stage, dirs, |dir| dedup.run(&dir.cache, ctx))?
            }
            StageKind::QualitySeparation => {
                let splitter = QualitySplitter::new(config.workers, config.quality_boundary_kb);
                per_working_dir(stage, dirs, |dir| splitter.run(&dir.cache, &dir.output, ctx))?
            }
            StageKind::MoveToOutput => {
                per_working_dir(stage, dirs, |dir| move_to_output(dir, config.workers, ctx))?
            }
            StageKind::CacheCleanup => {
                let reclaimer = CacheReclaimer::new();
                cache_artifact_dirs(&config.cache_dir)
                    .iter()
                    .map(|dir| reclaimer.run(dir, ctx))
                    .collect()
            }
            StageKind::PruneCache => vec![prune_cache(config, ctx)],
        };
        Ok(reports)
    }

    fn copy_source(&self, ctx: &RunContext) -> Result<StageReport, SetupError> {
        let start = Instant::now();
        let config = &self.config;
        let target = config.cache_dir.join(UNSORTED_DIR);
        ctx.progress.begin(StageKind::SourceCopy.label(), 0);

        let files = copy_tree(&config.source, &target).map_err(|e| SetupError::Transfer {
            from: config.source.clone(),
            to: target.clone(),
            reason: e.to_string(),
        })?;
        info!(files, to = %target.display(), "source copied into cache");

        Ok(StageReport {
            cost_time: start.elapsed(),
            total: files,
            processed: files,
            details: StageDetails::Transfer { files },
            ..StageReport::empty(StageKind::SourceCopy, &config.source)
        })
    }
}

/// Run a stage once per working directory. A directory an earlier stage
/// never created (e.g. no PNGs) gets an empty report.
fn per_working_dir<F>(
    stage: StageKind,
    dirs: &[WorkingDir],
    mut run: F,
) -> Result<Vec<StageReport>, SetupError>
where
    F: FnMut(&WorkingDir) -> Result<StageReport, SetupError>,
{
    dirs.iter()
        .map(|dir| {
            if dir.cache.is_dir() {
                run(dir)
            } else {
                info!(stage = %stage, dir = %dir.cache.display(), "working directory absent, nothing to do");
                Ok(StageReport::empty(stage, &dir.cache))
            }
        })
        .collect()
}

fn move_to_output(dir: &WorkingDir, workers: usize, ctx: &RunContext) -> Result<StageReport, SetupError> {
    let items = list_files(&dir.cache)?;
    let subdirs = list_subdirs(&dir.cache)?;
    let pool = WorkerPool::new(workers)?;

    let run = pool.run(StageKind::MoveToOutput.label(), items, ctx, |item| {
        move_into_unique(&item.path, &dir.output, &item.name).map_err(|source| ItemError::Transfer {
            path: item.path.clone(),
            source,
        })
    });

    let files = run.outcomes.len();
    let mut report = StageReport::from_run(
        StageKind::MoveToOutput,
        &dir.cache,
        &run,
        StageDetails::Transfer { files },
    );

    // Nested folders of the source travel as whole trees
    if !ctx.cancel.is_cancelled() {
        for subdir in subdirs {
            let Some(name) = subdir.file_name() else {
                continue;
            };
            let target = dir.output.join(name);
            ctx.progress.set_current_job(&name.to_string_lossy());
            match move_path(&subdir, &target) {
                Ok(moved) => {
                    info!(from = %subdir.display(), to = %target.display(), moved, "moved folder to output");
                }
                Err(e) => {
                    warn!(dir = %subdir.display(), error = %e, "failed to move folder to output");
                    report.failed += 1;
                    report.errors.push(ItemFailure {
                        path: subdir.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
    Ok(report)
}

fn prune_cache(config: &RunConfig, ctx: &RunContext) -> StageReport {
    ctx.progress.begin(StageKind::PruneCache.label(), 0);
    let mut report = StageReport::empty(StageKind::PruneCache, &config.cache_dir);

    match delete_dirs(&config.cache_dir, true) {
        Ok(deleted) => {
            report.cost_time = deleted.cost_time;
            report.details = StageDetails::Prune {
                removed_dirs: deleted.removed_dirs,
            };
        }
        Err(e) => {
            warn!(dir = %config.cache_dir.display(), error = %e, "failed to prune cache");
            report.failed = 1;
            report.errors.push(ItemFailure {
                path: config.cache_dir.clone(),
                message: e.to_string(),
            });
        }
    }
    report
}

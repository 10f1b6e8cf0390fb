//! # Quality Module
//!
//! Splits a directory into two size tiers.
//!
//! File size stands in for quality: a file of at least the boundary (in
//! KB, integer division) goes to `QUALITY`, anything smaller to `LOW`.
//! Files are moved, not copied.

use crate::config::DEFAULT_QUALITY_BOUNDARY_KB;
use crate::core::files::move_into_unique;
use crate::core::report::{StageDetails, StageKind, StageReport};
use crate::core::scanner::{list_files, JobItem};
use crate::core::worker::WorkerPool;
use crate::error::{ItemError, SetupError};
use crate::progress::RunContext;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Size tier of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    High,
    Low,
}

impl Tier {
    /// Tier for a file of `size_bytes` against a boundary in KB
    pub fn for_size(size_bytes: u64, boundary_kb: u64) -> Self {
        if size_bytes / 1024 >= boundary_kb {
            Tier::High
        } else {
            Tier::Low
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::High => "QUALITY",
            Tier::Low => "LOW",
        }
    }
}

/// Moves files into `QUALITY` / `LOW` subdirectories
#[derive(Debug, Clone, Copy)]
pub struct QualitySplitter {
    workers: usize,
    boundary_kb: u64,
}

impl QualitySplitter {
    pub fn new(workers: usize, boundary_kb: u64) -> Self {
        Self {
            workers,
            boundary_kb,
        }
    }

    pub fn boundary_kb(&self) -> u64 {
        self.boundary_kb
    }

    /// Move every file directly inside `src` into a tier under `dst_root`
    pub fn run(&self, src: &Path, dst_root: &Path, ctx: &RunContext) -> Result<StageReport, SetupError> {
        let items = list_files(src)?;
        let pool = WorkerPool::new(self.workers)?;

        let run = pool.run(StageKind::QualitySeparation.label(), items, ctx, |item| {
            split_one(item, dst_root, self.boundary_kb)
        });

        let high = run.outcomes.iter().filter(|(_, t)| *t == Tier::High).count();
        let low = run.outcomes.len() - high;
        info!(src = %src.display(), boundary_kb = self.boundary_kb, high, low, "quality separation finished");

        Ok(StageReport::from_run(
            StageKind::QualitySeparation,
            src,
            &run,
            StageDetails::Tiers { high, low },
        ))
    }
}

impl Default for QualitySplitter {
    fn default() -> Self {
        Self::new(1, DEFAULT_QUALITY_BOUNDARY_KB)
    }
}

fn split_one(item: &JobItem, dst_root: &Path, boundary_kb: u64) -> Result<Tier, ItemError> {
    // Measured now, the listing may be stale
    let size = fs::metadata(&item.path)
        .map_err(|source| ItemError::Io {
            path: item.path.clone(),
            source,
        })?
        .len();
    let tier = Tier::for_size(size, boundary_kb);

    let dir = dst_root.join(tier.dir_name());
    move_into_unique(&item.path, &dir, &item.name).map_err(|source| ItemError::Transfer {
        path: item.path.clone(),
        source,
    })?;

    debug!(file = %item.name, size, ?tier, "split");
    Ok(tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_kb(dir: &Path, name: &str, kb: usize) {
        fs::write(dir.join(name), vec![0u8; kb * 1024]).unwrap();
    }

    #[test]
    fn boundary_is_inclusive_on_whole_kilobytes() {
        assert_eq!(Tier::for_size(500 * 1024, 500), Tier::High);
        assert_eq!(Tier::for_size(500 * 1024 - 1, 500), Tier::Low);
        assert_eq!(Tier::for_size(0, 0), Tier::High);
    }

    #[test]
    fn split_is_a_total_partition() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("cache");
        let out = temp_dir.path().join("out");
        fs::create_dir_all(&src).unwrap();
        write_kb(&src, "big1.jpg", 12);
        write_kb(&src, "big2.jpg", 10);
        write_kb(&src, "small1.jpg", 2);
        write_kb(&src, "small2.jpg", 9);
        write_kb(&src, "small3.jpg", 0);

        let report = QualitySplitter::new(2, 10)
            .run(&src, &out, &RunContext::new())
            .unwrap();

        assert_eq!(report.details, StageDetails::Tiers { high: 2, low: 3 });
        assert_eq!(fs::read_dir(out.join("QUALITY")).unwrap().count(), 2);
        assert_eq!(fs::read_dir(out.join("LOW")).unwrap().count(), 3);
        assert_eq!(fs::read_dir(&src).unwrap().count(), 0);
    }

    #[test]
    fn existing_names_in_tier_are_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("cache");
        let out = temp_dir.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(out.join("LOW")).unwrap();
        fs::write(out.join("LOW/a.jpg"), b"older").unwrap();
        fs::write(src.join("a.jpg"), b"newer").unwrap();

        QualitySplitter::new(1, 500).run(&src, &out, &RunContext::new()).unwrap();

        assert_eq!(fs::read(out.join("LOW/a.jpg")).unwrap(), b"older");
        assert_eq!(fs::read(out.join("LOW/0A_1_a.jpg")).unwrap(), b"newer");
    }

    #[test]
    fn progress_names_the_stage() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("cache");
        fs::create_dir_all(&src).unwrap();
        write_kb(&src, "a.jpg", 1);
        let ctx = RunContext::new();

        QualitySplitter::default()
            .run(&src, &temp_dir.path().join("out"), &ctx)
            .unwrap();

        let snapshot = ctx.progress.snapshot();
        assert_eq!(snapshot.current_task, "separate quality");
        assert_eq!(snapshot.processed, 1);
    }
}

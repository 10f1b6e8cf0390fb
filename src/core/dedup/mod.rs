//! # Dedup Module
//!
//! Exact-content deduplication of one working directory.
//!
//! Every file is hashed in parallel. The first file to register a digest is
//! kept; any later file with the same digest is deleted. The set of known
//! digests lives for exactly one run of [`Deduplicator::run`], so two
//! directories deduplicated back to back never see each other's hashes.
//!
//! Which copy survives depends on worker scheduling. Exactly one copy of
//! each distinct content survives.

use crate::core::hasher::content_hash;
use crate::core::report::{StageDetails, StageKind, StageReport};
use crate::core::scanner::{list_files, JobItem};
use crate::core::worker::WorkerPool;
use crate::error::{ItemError, SetupError};
use crate::progress::RunContext;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First file seen with this content
    Kept,
    /// Content already registered; the file was deleted
    Removed,
}

/// Digests registered so far in one deduplication run
#[derive(Debug, Default)]
pub struct KnownHashes {
    inner: Mutex<HashSet<String>>,
}

impl KnownHashes {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `hash` for `path`, or delete `path` if the hash is known.
    ///
    /// The lookup, the insert and the delete happen under one lock, so two
    /// identical files hashed at the same moment can never both be kept or
    /// both be deleted.
    pub fn register_or_remove(&self, hash: String, path: &Path) -> Result<DedupOutcome, ItemError> {
        let mut known = self.lock();
        if known.contains(&hash) {
            fs::remove_file(path).map_err(|source| ItemError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            debug!(file = %path.display(), hash = %hash, "removed duplicate");
            Ok(DedupOutcome::Removed)
        } else {
            known.insert(hash);
            Ok(DedupOutcome::Kept)
        }
    }

    /// Number of distinct digests registered
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Removes content-identical copies from a directory
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    workers: usize,
}

impl Deduplicator {
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Deduplicate the files directly inside `dir`.
    ///
    /// A file that cannot be read or deleted is recorded in the report and
    /// left in place.
    pub fn run(&self, dir: &Path, ctx: &RunContext) -> Result<StageReport, SetupError> {
        let items = list_files(dir)?;
        self.run_items(dir, items, ctx)
    }

    fn run_items(&self, dir: &Path, items: Vec<JobItem>, ctx: &RunContext) -> Result<StageReport, SetupError> {
        let pool = WorkerPool::new(self.workers)?;
        let known = KnownHashes::new();

        let run = pool.run(StageKind::Deduplication.label(), items, ctx, |item| {
            let hash = content_hash(&item.path)?;
            known.register_or_remove(hash, &item.path)
        });

        let removed_count = run
            .outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == DedupOutcome::Removed)
            .count();
        let distinct_hashes = known.len();

        info!(
            dir = %dir.display(),
            removed_count,
            distinct_hashes,
            "deduplication finished"
        );

        Ok(StageReport::from_run(
            StageKind::Deduplication,
            dir,
            &run,
            StageDetails::Dedup {
                removed_count,
                distinct_hashes,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn remaining(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn removes_all_but_one_copy() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            fs::write(temp_dir.path().join(name), b"same picture").unwrap();
        }
        fs::write(temp_dir.path().join("d.jpg"), b"different picture").unwrap();

        let report = Deduplicator::new(3)
            .run(temp_dir.path(), &RunContext::new())
            .unwrap();

        assert_eq!(report.removed_count(), Some(2));
        assert_eq!(
            report.details,
            StageDetails::Dedup {
                removed_count: 2,
                distinct_hashes: 2
            }
        );
        assert_eq!(remaining(temp_dir.path()), 2);
        assert!(temp_dir.path().join("d.jpg").exists());
    }

    #[test]
    fn second_run_removes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(temp_dir.path().join("b.jpg"), b"x").unwrap();
        let dedup = Deduplicator::new(2);
        let ctx = RunContext::new();

        let first = dedup.run(temp_dir.path(), &ctx).unwrap();
        let second = dedup.run(temp_dir.path(), &ctx).unwrap();

        assert_eq!(first.removed_count(), Some(1));
        assert_eq!(second.removed_count(), Some(0));
        assert_eq!(remaining(temp_dir.path()), 1);
    }

    #[test]
    fn hashes_do_not_leak_between_directories() {
        let temp_dir = TempDir::new().unwrap();
        let jpeg = temp_dir.path().join("JPEG");
        let png = temp_dir.path().join("PNG");
        fs::create_dir_all(&jpeg).unwrap();
        fs::create_dir_all(&png).unwrap();
        fs::write(jpeg.join("a.jpg"), b"shared").unwrap();
        fs::write(png.join("a.png"), b"shared").unwrap();
        let dedup = Deduplicator::new(2);
        let ctx = RunContext::new();

        dedup.run(&jpeg, &ctx).unwrap();
        let report = dedup.run(&png, &ctx).unwrap();

        assert_eq!(report.removed_count(), Some(0));
        assert!(png.join("a.png").exists());
    }

    #[test]
    fn empty_directory_yields_empty_report() {
        let temp_dir = TempDir::new().unwrap();
        let report = Deduplicator::new(1)
            .run(temp_dir.path(), &RunContext::new())
            .unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.removed_count(), Some(0));
    }

    #[test]
    fn missing_directory_is_setup_error() {
        let result = Deduplicator::new(1).run(Path::new("/nonexistent/cache"), &RunContext::new());
        assert!(matches!(result, Err(SetupError::DirectoryNotFound { .. })));
    }

    #[test]
    fn progress_names_the_stage() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"1").unwrap();
        fs::write(temp_dir.path().join("b.jpg"), b"2").unwrap();
        let ctx = RunContext::new();

        Deduplicator::new(2).run(temp_dir.path(), &ctx).unwrap();

        let snapshot = ctx.progress.snapshot();
        assert_eq!(snapshot.current_task, "clear duplicate");
        assert_eq!(snapshot.total_jobs, 2);
        assert_eq!(snapshot.processed, 2);
    }

    #[test]
    fn known_hashes_register_once() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.jpg");
        let second = temp_dir.path().join("b.jpg");
        fs::write(&first, b"x").unwrap();
        fs::write(&second, b"x").unwrap();
        let known = KnownHashes::new();

        assert_eq!(
            known.register_or_remove("h".to_string(), &first).unwrap(),
            DedupOutcome::Kept
        );
        assert_eq!(
            known.register_or_remove("h".to_string(), &second).unwrap(),
            DedupOutcome::Removed
        );
        assert!(first.exists());
        assert!(!second.exists());
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn unreadable_file_is_neither_deleted_nor_registered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg"] {
            fs::write(temp_dir.path().join(name), b"same picture").unwrap();
        }
        fs::write(temp_dir.path().join("c.jpg"), b"other picture").unwrap();
        let mut items = list_files(temp_dir.path()).unwrap();
        // Listed, then gone before it could be hashed
        items.push(JobItem {
            path: temp_dir.path().join("vanished.jpg"),
            name: "vanished.jpg".to_string(),
            size: 12,
        });

        let report = Deduplicator::new(2)
            .run_items(temp_dir.path(), items, &RunContext::new())
            .unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].path, temp_dir.path().join("vanished.jpg"));
        let hashed = report.processed - report.failed;
        assert_eq!(
            report.details,
            StageDetails::Dedup {
                removed_count: 1,
                distinct_hashes: 2
            }
        );
        assert_eq!(report.removed_count(), Some(hashed - 2));
        assert_eq!(remaining(temp_dir.path()), 2);
        assert!(temp_dir.path().join("c.jpg").exists());
    }
}

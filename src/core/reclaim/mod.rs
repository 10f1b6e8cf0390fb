//! # Reclaim Module
//!
//! Deletes the image files earlier stages left in the cache.
//!
//! Single-threaded; the walk is bound by disk I/O. A missing cache
//! directory means there is nothing to reclaim.

use crate::core::report::{StageDetails, StageKind, StageReport};
use crate::core::scanner::ExtensionFilter;
use crate::core::worker::ItemFailure;
use crate::progress::RunContext;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Walks a cache tree and deletes matching files
#[derive(Debug, Clone, Default)]
pub struct CacheReclaimer {
    filter: ExtensionFilter,
}

impl CacheReclaimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: ExtensionFilter) -> Self {
        Self { filter }
    }

    /// Delete every matching file under `dir`, deepest first
    pub fn run(&self, dir: &Path, ctx: &RunContext) -> StageReport {
        let start = Instant::now();
        let mut report = StageReport::empty(StageKind::CacheCleanup, dir);
        let mut removed_count = 0usize;
        let mut total_size = 0u64;

        if !dir.exists() {
            debug!(dir = %dir.display(), "nothing to reclaim");
            report.details = StageDetails::Reclaim {
                removed_count,
                total_size,
            };
            return report;
        }

        let candidates: Vec<_> = WalkDir::new(dir)
            .contents_first(true)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable cache entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.filter.matches(entry.path()))
            .collect();

        report.total = candidates.len();
        ctx.progress.begin(StageKind::CacheCleanup.label(), candidates.len());

        for entry in candidates {
            if ctx.cancel.is_cancelled() {
                report.skipped += 1;
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    removed_count += 1;
                    total_size += size;
                    debug!(file = %entry.path().display(), size, "reclaimed");
                }
                Err(e) => {
                    warn!(file = %entry.path().display(), error = %e, "failed to reclaim");
                    report.failed += 1;
                    report.errors.push(ItemFailure {
                        path: entry.path().to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
            report.processed += 1;
            ctx.progress.complete(&name);
        }

        report.cost_time = start.elapsed();
        report.details = StageDetails::Reclaim {
            removed_count,
            total_size,
        };
        info!(
            dir = %dir.display(),
            removed_count,
            total_size,
            elapsed_ms = report.cost_time.as_millis() as u64,
            "cache reclaimed"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_path_is_a_no_op() {
        let report = CacheReclaimer::new().run(Path::new("/nonexistent/cache"), &RunContext::new());

        assert_eq!(report.removed_count(), Some(0));
        assert_eq!(report.total_size(), Some(0));
        assert!(report.errors.is_empty());
    }

    #[test]
    fn removes_only_cache_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("JPEG")).unwrap();
        fs::create_dir_all(root.join("PNG/nested")).unwrap();
        fs::write(root.join("JPEG/a.jpg"), vec![0u8; 100]).unwrap();
        fs::write(root.join("PNG/nested/b.PNG"), vec![0u8; 50]).unwrap();
        fs::write(root.join("notes.txt"), b"keep me").unwrap();
        let ctx = RunContext::new();

        let report = CacheReclaimer::new().run(root, &ctx);

        assert_eq!(report.removed_count(), Some(2));
        assert_eq!(report.total_size(), Some(150));
        assert!(root.join("notes.txt").exists());
        assert!(!root.join("JPEG/a.jpg").exists());
        assert_eq!(ctx.progress.snapshot().current_task, "clear cache");
    }

    #[test]
    fn custom_filter_limits_deletion() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.png"), b"x").unwrap();
        fs::write(temp_dir.path().join("b.jpg"), b"y").unwrap();

        let report = CacheReclaimer::with_filter(ExtensionFilter::with_extensions(["png"]))
            .run(temp_dir.path(), &RunContext::new());

        assert_eq!(report.removed_count(), Some(1));
        assert!(temp_dir.path().join("b.jpg").exists());
    }
}

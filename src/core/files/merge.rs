//! Merge two similarly structured directory trees into one.

use super::naming::unique_destination;
use super::transfer::copy_file;
use crate::error::FsError;
use crate::progress::ProgressRegistry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Task name shown while merging
pub const MERGE_TASK: &str = "merge";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub cost_time: Duration,
    /// Files copied into the destination
    pub copied: usize,
    /// Files that landed under a `0A_{n}_` name
    pub renamed: usize,
}

/// Copy every file of `first` and then `second` into `dst`, keeping each
/// file's path relative to its source root.
///
/// A file whose destination already exists is copied under the next free
/// collision name instead of overwriting. Progress is reported with total
/// = number of files across both sources.
pub fn merge_dirs(
    first: &Path,
    second: &Path,
    dst: &Path,
    progress: &ProgressRegistry,
) -> Result<MergeReport, FsError> {
    let start = Instant::now();
    let sources = [first, second];
    for src in sources {
        if !src.is_dir() {
            return Err(FsError::NotFound {
                path: src.to_path_buf(),
            });
        }
    }

    let mut files = Vec::new();
    for src in sources {
        for (relative, path) in tree_files(src)? {
            files.push((src, relative, path));
        }
    }

    progress.begin(MERGE_TASK, files.len());
    info!(total = files.len(), dst = %dst.display(), "merge started");

    let mut report = MergeReport {
        cost_time: Duration::ZERO,
        copied: 0,
        renamed: 0,
    };
    for (src, relative, path) in files {
        let dst_dir = match relative.parent() {
            Some(parent) => dst.join(parent),
            None => dst.to_path_buf(),
        };
        fs::create_dir_all(&dst_dir).map_err(|e| FsError::io(&dst_dir, e))?;

        let name = file_name(&path);
        let target = unique_destination(&dst_dir, &name);
        if target.file_name().map(|n| n != name.as_str()).unwrap_or(false) {
            report.renamed += 1;
        }

        copy_file(&path, &target)?;
        debug!(from = %path.display(), to = %target.display(), root = %src.display(), "merged");
        report.copied += 1;
        progress.complete(&name);
    }

    report.cost_time = start.elapsed();
    info!(
        copied = report.copied,
        renamed = report.renamed,
        elapsed_ms = report.cost_time.as_millis() as u64,
        "merge finished"
    );
    Ok(report)
}

/// Regular files under `root` paired with their path relative to it
pub(crate) fn tree_files(root: &Path) -> Result<Vec<(PathBuf, PathBuf)>, FsError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| FsError::Walk {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .map_err(|e| FsError::Walk {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
        files.push((relative, entry.into_path()));
    }
    Ok(files)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

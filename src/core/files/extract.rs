//! Flatten a directory tree into a single directory.

use super::merge::{file_name, tree_files};
use super::naming::unique_destination;
use super::transfer::move_file;
use crate::error::FsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractReport {
    pub cost_time: Duration,
    pub moved: usize,
    pub renamed: usize,
}

/// Move every file anywhere under `src` into `dst` (or `dst/target_subdir`).
///
/// Name clashes get the next free `0A_{n}_` name. Emptied source
/// directories are left behind; `delete_dirs` prunes them.
pub fn extract_files(
    src: &Path,
    dst: &Path,
    target_subdir: Option<&str>,
) -> Result<ExtractReport, FsError> {
    let start = Instant::now();
    if !src.is_dir() {
        return Err(FsError::NotFound {
            path: src.to_path_buf(),
        });
    }

    let dest_dir = match target_subdir {
        Some(sub) => dst.join(sub),
        None => dst.to_path_buf(),
    };
    // Listed up front so files moved into a destination inside `src` are
    // not visited twice
    let files = tree_files(src)?;
    fs::create_dir_all(&dest_dir).map_err(|e| FsError::io(&dest_dir, e))?;

    let mut report = ExtractReport {
        cost_time: Duration::ZERO,
        moved: 0,
        renamed: 0,
    };
    for (_, path) in files {
        if path.parent() == Some(dest_dir.as_path()) {
            continue;
        }
        let name = file_name(&path);
        let target = unique_destination(&dest_dir, &name);
        if target.file_name().map(|n| n != name.as_str()).unwrap_or(false) {
            report.renamed += 1;
        }
        move_file(&path, &target)?;
        debug!(from = %path.display(), to = %target.display(), "extracted");
        report.moved += 1;
    }

    report.cost_time = start.elapsed();
    info!(moved = report.moved, renamed = report.renamed, dst = %dest_dir.display(), "extract finished");
    Ok(report)
}

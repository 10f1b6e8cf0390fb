//! Directory pruning.

use crate::error::FsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReport {
    pub cost_time: Duration,
    pub removed_dirs: usize,
}

/// Remove subdirectories of `target`, deepest first.
///
/// With `only_empty` a directory is removed only if it is empty when
/// visited; since children are visited before parents, directories holding
/// nothing but empty directories go too. Without it every subdirectory is
/// removed with its contents. `target` itself and the files directly in it
/// are never touched.
pub fn delete_dirs(target: &Path, only_empty: bool) -> Result<DeleteReport, FsError> {
    let start = Instant::now();
    if !target.is_dir() {
        return Err(FsError::NotFound {
            path: target.to_path_buf(),
        });
    }

    let removed_dirs = if only_empty {
        prune_empty(target)?
    } else {
        remove_subdirectories(target)?
    };

    let report = DeleteReport {
        cost_time: start.elapsed(),
        removed_dirs,
    };
    info!(target = %target.display(), only_empty, removed_dirs, "delete finished");
    Ok(report)
}

fn prune_empty(target: &Path) -> Result<usize, FsError> {
    let mut removed = 0;
    for entry in WalkDir::new(target).min_depth(1).contents_first(true) {
        let entry = entry.map_err(|e| FsError::Walk {
            path: target.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_empty = fs::read_dir(entry.path())
            .map_err(|e| FsError::io(entry.path(), e))?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(entry.path()).map_err(|e| FsError::io(entry.path(), e))?;
            debug!(dir = %entry.path().display(), "removed empty directory");
            removed += 1;
        }
    }
    Ok(removed)
}

fn remove_subdirectories(target: &Path) -> Result<usize, FsError> {
    let mut removed = 0;
    for entry in fs::read_dir(target).map_err(|e| FsError::io(target, e))? {
        let entry = entry.map_err(|e| FsError::io(target, e))?;
        let file_type = entry.file_type().map_err(|e| FsError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        let path = entry.path();
        let nested = WalkDir::new(&path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .count();
        fs::remove_dir_all(&path).map_err(|e| FsError::io(&path, e))?;
        debug!(dir = %path.display(), "removed directory tree");
        removed += nested;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn only_empty_cascades_upward() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::write(root.join("keep/photo.jpg"), b"x").unwrap();

        let report = delete_dirs(root, true).unwrap();

        assert_eq!(report.removed_dirs, 3);
        assert!(!root.join("a").exists());
        assert!(root.join("keep/photo.jpg").exists());
        assert!(root.exists());
    }

    #[test]
    fn full_delete_removes_every_subdirectory_but_keeps_top_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("JPEG/nested")).unwrap();
        fs::write(root.join("JPEG/a.jpg"), b"x").unwrap();
        fs::write(root.join("loose.txt"), b"keep").unwrap();

        let report = delete_dirs(root, false).unwrap();

        assert_eq!(report.removed_dirs, 2);
        assert!(!root.join("JPEG").exists());
        assert!(root.join("loose.txt").exists());
    }

    #[test]
    fn missing_target_is_not_found() {
        let result = delete_dirs(Path::new("/nonexistent/cache"), true);
        assert!(matches!(result, Err(FsError::NotFound { .. })));
    }
}

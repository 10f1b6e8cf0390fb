//! Move and copy primitives.

use super::naming::reserve_unique_file;
use crate::error::FsError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Move one file, falling back to copy + verify + delete when `rename`
/// cannot cross filesystems. Overwrites `to` if it exists.
pub fn move_file(from: &Path, to: &Path) -> Result<(), FsError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    let source_size = fs::metadata(from).map_err(|e| FsError::io(from, e))?.len();
    fs::copy(from, to).map_err(|e| FsError::io(to, e))?;

    // Never delete the source of an incomplete copy
    let dest_size = fs::metadata(to).map_err(|e| FsError::io(to, e))?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(to);
        return Err(FsError::Verification {
            path: to.to_path_buf(),
            expected: source_size,
            actual: dest_size,
        });
    }

    fs::remove_file(from).map_err(|e| FsError::io(from, e))
}

/// Move `from` into `dir` as `name`, or as the next free `0A_{n}_` name.
///
/// The name is reserved atomically, so concurrent movers into the same
/// directory never overwrite each other.
pub fn move_into_unique(from: &Path, dir: &Path, name: &str) -> Result<PathBuf, FsError> {
    fs::create_dir_all(dir).map_err(|e| FsError::io(dir, e))?;
    let (target, placeholder) =
        reserve_unique_file(dir, name).map_err(|e| FsError::io(dir.join(name), e))?;
    drop(placeholder);

    if let Err(e) = move_file(from, &target) {
        let _ = fs::remove_file(&target);
        return Err(e);
    }
    Ok(target)
}

/// Copy one file, creating the destination's parent directories
pub fn copy_file(from: &Path, to: &Path) -> Result<u64, FsError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| FsError::io(from, e))
}

/// Move a file or the contents of a directory.
///
/// Moving a directory moves each of its entries into `to` (created if
/// missing) and then removes the emptied source directory. Returns the
/// number of top-level entries moved.
pub fn move_path(from: &Path, to: &Path) -> Result<usize, FsError> {
    let metadata = fs::metadata(from).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FsError::NotFound {
            path: from.to_path_buf(),
        },
        _ => FsError::io(from, e),
    })?;

    if !metadata.is_dir() {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
        }
        move_file(from, to)?;
        return Ok(1);
    }

    fs::create_dir_all(to).map_err(|e| FsError::io(to, e))?;
    let mut moved = 0;
    for entry in fs::read_dir(from).map_err(|e| FsError::io(from, e))? {
        let entry = entry.map_err(|e| FsError::io(from, e))?;
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            move_path(&entry.path(), &target)?;
        } else {
            move_file(&entry.path(), &target)?;
        }
        moved += 1;
    }

    fs::remove_dir(from).map_err(|e| FsError::io(from, e))?;
    debug!(from = %from.display(), to = %to.display(), moved, "moved directory contents");
    Ok(moved)
}

/// Recursively copy `from` into `to`, merging into existing directories and
/// overwriting files of the same name. Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize, FsError> {
    if !from.is_dir() {
        return Err(FsError::NotFound {
            path: from.to_path_buf(),
        });
    }

    let mut copied = 0;
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| FsError::Walk {
            path: from.to_path_buf(),
            reason: e.to_string(),
        })?;
        let relative = entry.path().strip_prefix(from).map_err(|e| FsError::Walk {
            path: entry.path().to_path_buf(),
            reason: e.to_string(),
        })?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| FsError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

//! Directory listing using walkdir.

use super::JobItem;
use crate::error::SetupError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// List the regular files directly inside `dir`, sorted by name.
///
/// Subdirectories and symlinks are ignored. Entries that vanish or cannot
/// be stat'ed while listing are logged and skipped; only a missing or
/// unreadable `dir` itself is an error.
pub fn list_files(dir: &Path) -> Result<Vec<JobItem>, SetupError> {
    if !dir.exists() {
        return Err(SetupError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(SetupError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    // Surface permission problems on the directory itself as a setup error
    std::fs::read_dir(dir).map_err(|e| SetupError::ReadDirectory {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut items = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => items.push(JobItem {
                path: entry.path().to_path_buf(),
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
            }),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping file without metadata");
            }
        }
    }

    Ok(items)
}

/// List the directories directly inside `dir`, sorted by name.
///
/// Symlinks are not followed. A missing `dir` is an error, like
/// [`list_files`].
pub fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>, SetupError> {
    if !dir.is_dir() {
        return Err(SetupError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut dirs = Vec::new();
    for entry_result in walker {
        match entry_result {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "skipping unreadable entry"),
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn list_empty_directory_returns_empty_vec() {
        let temp_dir = TempDir::new().unwrap();
        let items = list_files(temp_dir.path()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn list_records_name_and_size() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "photo.jpg", b"12345");

        let items = list_files(temp_dir.path()).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "photo.jpg");
        assert_eq!(items[0].size, 5);
    }

    #[test]
    fn list_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "top.png", b"x");
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        create_file(&nested, "deep.png", b"y");

        let items = list_files(temp_dir.path()).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "top.png");
    }

    #[test]
    fn list_includes_every_extension() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "b.txt", b"x");
        create_file(temp_dir.path(), "a.jpg", b"y");
        create_file(temp_dir.path(), ".hidden.png", b"z");

        let names: Vec<_> = list_files(temp_dir.path())
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();

        assert_eq!(names, vec![".hidden.png", "a.jpg", "b.txt"]);
    }

    #[test]
    fn list_nonexistent_directory_is_setup_error() {
        let result = list_files(Path::new("/nonexistent/path/12345"));
        assert!(matches!(result, Err(SetupError::DirectoryNotFound { .. })));
    }

    #[test]
    fn list_file_instead_of_directory_is_setup_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = create_file(temp_dir.path(), "single.jpg", b"x");

        let result = list_files(&file);

        assert!(matches!(result, Err(SetupError::NotADirectory { .. })));
    }

    #[test]
    fn list_subdirs_skips_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("b/inner")).unwrap();
        fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        create_file(temp_dir.path(), "photo.jpg", b"x");

        let dirs = list_subdirs(temp_dir.path()).unwrap();

        assert_eq!(dirs, vec![temp_dir.path().join("a"), temp_dir.path().join("b")]);
    }
}

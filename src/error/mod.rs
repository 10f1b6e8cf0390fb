//! # Error Module
//!
//! Error types for the photo sieve.
//!
//! ## Taxonomy
//! - **Item errors** - one file failed (corrupt, unreadable, codec failure).
//!   Caught at the task boundary, logged, recorded in the stage report.
//!   The stage carries on.
//! - **Setup errors** - the stage cannot start at all (missing source,
//!   unwritable destination, pool creation failure). These abort the run.
//! - **Config errors** - caller input that does not validate.
//! - **Fs errors** - failures of the directory utilities (merge, extract, delete).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File operation error: {0}")]
    Fs(#[from] FsError),

    #[error("Item error: {0}")]
    Item(#[from] ItemError),
}

/// Errors that prevent a stage (and therefore the run) from starting
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool with {workers} threads: {reason}")]
    WorkerPool { workers: usize, reason: String },

    #[error("Failed to copy {from} into {to}: {reason}")]
    Transfer {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}

/// Errors for a single file inside a stage
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to encode image {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Failed to move {path}: {source}")]
    Transfer {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("Worker panicked while processing {path}: {reason}")]
    Panicked { path: PathBuf, reason: String },
}

impl ItemError {
    /// Path of the file the error belongs to
    pub fn path(&self) -> &PathBuf {
        match self {
            ItemError::Io { path, .. }
            | ItemError::Decode { path, .. }
            | ItemError::Encode { path, .. }
            | ItemError::Transfer { path, .. }
            | ItemError::Panicked { path, .. } => path,
        }
    }
}

/// Errors from the canonical encoders
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{width}x{height} exceeds the JPEG size limit")]
    TooLarge { width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

/// Invalid caller input. Not a system fault.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Worker count is required")]
    MissingWorkerCount,

    #[error("Invalid worker count '{input}': expected a positive integer")]
    InvalidWorkerCount { input: String },

    #[error("Missing required path: {field}")]
    MissingPath { field: &'static str },

    #[error("Invalid quality boundary '{input}': expected a whole number of kilobytes")]
    InvalidQualityBoundary { input: String },

    #[error("{first} and {second} must be different directories")]
    OverlappingPaths {
        first: &'static str,
        second: &'static str,
    },

    #[error("{inner} must not be inside {outer}")]
    NestedPaths {
        inner: &'static str,
        outer: &'static str,
    },

    #[error("A run is already in progress")]
    Busy,
}

/// Errors from the directory utilities
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    #[error("Copy verification failed for {path}: source {expected} bytes, destination {actual} bytes")]
    Verification {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FsError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SieveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_includes_path() {
        let error = SetupError::DirectoryNotFound {
            path: PathBuf::from("/photos/inbox"),
        };
        assert!(error.to_string().contains("/photos/inbox"));
    }

    #[test]
    fn item_error_exposes_path() {
        let error = ItemError::Decode {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "truncated".to_string(),
        };
        assert_eq!(error.path(), &PathBuf::from("/photos/broken.jpg"));
        assert!(error.to_string().contains("truncated"));
    }

    #[test]
    fn config_error_names_bad_input() {
        let error = ConfigError::InvalidWorkerCount {
            input: "four".to_string(),
        };
        assert!(error.to_string().contains("'four'"));
    }

    #[test]
    fn setup_error_converts_to_top_level() {
        let error: SieveError = SetupError::NotADirectory {
            path: PathBuf::from("/tmp/file.jpg"),
        }
        .into();
        assert!(matches!(error, SieveError::Setup(_)));
    }
}

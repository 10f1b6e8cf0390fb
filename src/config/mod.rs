//! # Config Module
//!
//! Run configuration for the filter pipeline and defaults for every tool.
//!
//! ## Defaults
//! - Workers: available parallelism (at least 1)
//! - Quality boundary: 500 KB
//! - Flags: `by_quality`, `clear_duplicate` and `clear_cache` on, `by_mode` off
//! - Cache: `{platform cache dir}/photo-sieve/filter`
//! - Output: `./filter`, merge output `./merge`, extract output `./extract`

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Default size boundary between the two quality tiers, in kilobytes
pub const DEFAULT_QUALITY_BOUNDARY_KB: u64 = 500;

/// Application directory name under the platform cache dir
const APP_DIR: &str = "photo-sieve";

/// Which pipeline stages are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    /// Re-encode into canonical formats and split by format
    pub by_mode: bool,
    /// Split into size tiers
    pub by_quality: bool,
    /// Delete content-identical copies
    pub clear_duplicate: bool,
    /// Delete intermediate cache files and prune empty cache directories
    pub clear_cache: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            by_mode: false,
            by_quality: true,
            clear_duplicate: true,
            clear_cache: true,
        }
    }
}

/// Configuration for one filter run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding the images to sort
    pub source: PathBuf,
    /// Working directory for intermediate results
    pub cache_dir: PathBuf,
    /// Final output root
    pub output_dir: PathBuf,
    /// Worker threads per stage
    pub workers: usize,
    /// Tier boundary in kilobytes (files at or above go to the high tier)
    pub quality_boundary_kb: u64,
    pub flags: StageFlags,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            cache_dir: default_cache_dir(),
            output_dir: default_output_dir(),
            workers: default_workers(),
            quality_boundary_kb: DEFAULT_QUALITY_BOUNDARY_KB,
            flags: StageFlags::default(),
        }
    }
}

impl RunConfig {
    /// Check required paths and basic consistency.
    ///
    /// Existence of the source is checked later, when the run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.source) {
            return Err(ConfigError::MissingPath { field: "source" });
        }
        if is_blank(&self.cache_dir) {
            return Err(ConfigError::MissingPath { field: "cache_dir" });
        }
        if is_blank(&self.output_dir) {
            return Err(ConfigError::MissingPath { field: "output_dir" });
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount {
                input: "0".to_string(),
            });
        }
        if self.source == self.cache_dir {
            return Err(ConfigError::OverlappingPaths {
                first: "source",
                second: "cache_dir",
            });
        }
        if self.cache_dir == self.output_dir {
            return Err(ConfigError::OverlappingPaths {
                first: "cache_dir",
                second: "output_dir",
            });
        }

        // The cache must not share a tree with the user's files
        let source = absolute(&self.source);
        let cache = absolute(&self.cache_dir);
        let output = absolute(&self.output_dir);
        if source.starts_with(&cache) {
            return Err(ConfigError::NestedPaths {
                inner: "source",
                outer: "cache_dir",
            });
        }
        if output.starts_with(&cache) {
            return Err(ConfigError::NestedPaths {
                inner: "output_dir",
                outer: "cache_dir",
            });
        }
        if cache.starts_with(&source) {
            return Err(ConfigError::NestedPaths {
                inner: "cache_dir",
                outer: "source",
            });
        }
        Ok(())
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Lexically absolute form of `path`, without `.` and `..` components
fn absolute(path: &Path) -> PathBuf {
    let joined = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Parse a worker count typed by a user.
///
/// Accepts surrounding whitespace; rejects empty input, zero, negatives and
/// anything non-numeric.
pub fn parse_worker_count(input: &str) -> Result<usize, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingWorkerCount);
    }
    match trimmed.parse::<usize>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(ConfigError::InvalidWorkerCount {
            input: input.to_string(),
        }),
    }
}

/// Parse a quality boundary typed by a user, in kilobytes
pub fn parse_quality_boundary(input: &str) -> Result<u64, ConfigError> {
    input
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidQualityBoundary {
            input: input.to_string(),
        })
}

/// Number of CPUs available to this process, at least 1
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Default working directory for intermediate results
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(APP_DIR)
        .join("filter")
}

/// Default output root of the filter pipeline
pub fn default_output_dir() -> PathBuf {
    PathBuf::from("filter")
}

/// Default destination of the merge tool
pub fn default_merge_dir() -> PathBuf {
    PathBuf::from("merge")
}

/// Default destination of the extract tool
pub fn default_extract_dir() -> PathBuf {
    PathBuf::from("extract")
}

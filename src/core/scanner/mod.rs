//! # Scanner Module
//!
//! Lists the job items of a stage.
//!
//! Every stage works on the regular files sitting directly in one directory
//! (no recursion): the classifier reads the source, deduplication and the
//! quality split read a working directory the previous stage produced.
//!
//! ## Example
//! ```rust,ignore
//! use photo_sieve::core::scanner::list_files;
//!
//! let items = list_files(Path::new("/photos/inbox"))?;
//! println!("{} files to process", items.len());
//! ```

mod filter;
mod walker;

pub use filter::ExtensionFilter;
pub use walker::{list_files, list_subdirs};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One file awaiting processing within one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobItem {
    /// Full path to the file
    pub path: PathBuf,
    /// File name, used as the progress label
    pub name: String,
    /// Size in bytes at listing time
    pub size: u64,
}

impl JobItem {
    /// File name without its last extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

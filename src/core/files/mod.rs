//! # Files Module
//!
//! Directory utilities used by the pipeline and exposed to callers.
//!
//! - [`merge_dirs`] - copy two trees into one, keeping relative structure
//! - [`extract_files`] - flatten a tree into one directory
//! - [`delete_dirs`] - prune empty (or all) subdirectories
//! - [`move_path`] / [`copy_tree`] - recursive move and merge-copy
//!
//! Every helper that places a file under a name that may already exist
//! resolves the clash with the `0A_{n}_{name}` policy in [`naming`].

mod extract;
mod merge;
pub mod naming;
mod prune;
mod transfer;

pub use extract::{extract_files, ExtractReport};
pub use merge::{merge_dirs, MergeReport, MERGE_TASK};
pub use naming::{next_available_name, reserve_unique_file};
pub use prune::{delete_dirs, DeleteReport};
pub use transfer::{copy_file, copy_tree, move_file, move_into_unique, move_path};

//! Collision-avoiding destination names.
//!
//! A taken name `photo.jpg` becomes `0A_1_photo.jpg`, then `0A_2_photo.jpg`,
//! and so on until a free name is found.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name used for the `counter`-th collision of `name`
pub fn collision_name(counter: usize, name: &str) -> String {
    format!("0A_{counter}_{name}")
}

/// First free name for `candidate` given the names already taken
pub fn next_available_name(existing: &HashSet<String>, candidate: &str) -> String {
    next_available_name_by(candidate, |name| existing.contains(name))
}

/// First name for `candidate` that `is_taken` rejects
pub fn next_available_name_by<F>(candidate: &str, mut is_taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    if !is_taken(candidate) {
        return candidate.to_string();
    }
    (1..)
        .map(|counter| collision_name(counter, candidate))
        .find(|name| !is_taken(name))
        .unwrap_or_else(|| candidate.to_string())
}

/// Free destination path for `name` inside `dir`, checked against the disk.
///
/// Only safe for a single writer. Concurrent writers use
/// [`reserve_unique_file`].
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let chosen = next_available_name_by(name, |candidate| dir.join(candidate).exists());
    if chosen != name {
        info!(from = name, to = %chosen, "renamed on collision");
    }
    dir.join(chosen)
}

/// Atomically claim a free file name inside `dir`.
///
/// Each candidate is created with `create_new`, so two writers racing for
/// the same name can never both win it. Returns the claimed path and the
/// open, empty file.
pub fn reserve_unique_file(dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    let mut counter = 0usize;
    loop {
        let candidate = if counter == 0 {
            name.to_string()
        } else {
            collision_name(counter, name)
        };
        let path = dir.join(&candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                if counter > 0 {
                    info!(from = name, to = %candidate, "renamed on collision");
                }
                return Ok((path, file));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}

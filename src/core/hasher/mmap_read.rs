//! Memory-mapped file reads for hashing.
//!
//! Mapping avoids copying large files from the kernel into a heap buffer
//! just to feed them to the digest.

use crate::error::ItemError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Minimum file size to use memory-mapped I/O (1MB)
pub const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read a file, mapping it when it is at least [`MMAP_THRESHOLD`] bytes.
pub fn read_file_bytes(path: &Path) -> Result<FileBytes, ItemError> {
    let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;

    if metadata.len() >= MMAP_THRESHOLD {
        read_mmap(path)
    } else {
        std::fs::read(path)
            .map(FileBytes::Vec)
            .map_err(|e| io_error(path, e))
    }
}

fn read_mmap(path: &Path) -> Result<FileBytes, ItemError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;

    // SAFETY: the map is read-only and the handle lives as long as the map.
    // A concurrent writer could change the bytes under us; stages never
    // write a file another stage is hashing.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| io_error(path, e))?;

    Ok(FileBytes::Mmap(mmap))
}

fn io_error(path: &Path, source: std::io::Error) -> ItemError {
    ItemError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// File bytes that may be either owned or memory-mapped
pub enum FileBytes {
    Vec(Vec<u8>),
    Mmap(Mmap),
}

impl std::ops::Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileBytes::Vec(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

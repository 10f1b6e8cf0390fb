//! # Hasher Module
//!
//! Whole-file content hashing for exact deduplication.
//!
//! ## Algorithm
//! SHA-256 over the complete file contents, rendered as lowercase hex.
//! Two files share a digest only if their bytes are identical for any
//! practical purpose, so a match is safe grounds for deleting one copy.
//!
//! ## Performance
//! Files of 1MB and above are memory-mapped instead of read into a buffer.

mod mmap_read;

pub use mmap_read::{read_file_bytes, FileBytes, MMAP_THRESHOLD};

use crate::error::ItemError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Hex-encoded SHA-256 of a byte slice
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex-encoded SHA-256 of a file's contents
pub fn content_hash(path: &Path) -> Result<String, ItemError> {
    let bytes = read_file_bytes(path)?;
    Ok(digest_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn identical_files_share_a_hash() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.jpg");
        let b = temp_dir.path().join("b.jpg");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn different_files_differ() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.jpg");
        let b = temp_dir.path().join("b.jpg");
        fs::write(&a, b"one").unwrap();
        fs::write(&b, b"two").unwrap();

        assert_ne!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn large_files_hash_like_small_ones() {
        let temp_dir = TempDir::new().unwrap();
        let big = temp_dir.path().join("big.bin");
        let content = vec![7u8; (MMAP_THRESHOLD + 10) as usize];
        fs::write(&big, &content).unwrap();

        assert_eq!(content_hash(&big).unwrap(), digest_bytes(&content));
    }

    #[test]
    fn missing_file_is_item_error() {
        let result = content_hash(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(ItemError::Io { .. })));
    }
}

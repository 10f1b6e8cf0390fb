//! # Photo Sieve
//!
//! Batch sorting for folders of images.
//!
//! ## What a filter run does
//! - **Separate by format** - re-encode into JPEG or PNG (alpha decides)
//! - **Deduplicate** - delete byte-identical copies, keeping one
//! - **Separate by quality** - move files into size tiers
//! - **Clean up** - delete intermediate cache files
//!
//! Each stage processes its files in parallel on a bounded worker pool,
//! publishes progress that a caller can poll, and records per-file failures
//! instead of stopping.
//!
//! ## Architecture
//! - `core` - The stages, the orchestrator and the directory utilities
//! - `progress` - Pollable progress and per-run shared state
//! - `service` - Job submission and polling API for front ends
//! - `config` - Run configuration and defaults
//! - `error` - Error types

pub mod config;
pub mod core;
pub mod error;
pub mod progress;
pub mod service;

// Re-export commonly used types at the crate root
pub use error::{Result, SieveError};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG` wins
/// when set; otherwise `default_level` applies. Calling it twice is a no-op.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

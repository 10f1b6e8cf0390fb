//! # photo-sieve CLI
//!
//! Command-line interface for the photo sieve.
//!
//! ## Usage
//! ```bash
//! photo-sieve filter ~/Pictures/inbox --workers 4 --by-mode
//! photo-sieve merge ./2024-a ./2024-b --dst ./2024
//! photo-sieve extract ./2024 --dst ./flat --target-dir 2024
//! photo-sieve delete ~/.cache/photo-sieve --all
//! ```

mod cli;

use photo_sieve::Result;

fn main() -> Result<()> {
    cli::run()
}

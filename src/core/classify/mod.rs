//! # Classify Module
//!
//! Re-encodes every image of a directory into one of two canonical formats
//! and sorts the results by format.
//!
//! ## Routing
//! - Images with an alpha channel (palette images with transparency decode
//!   to an alpha colour type too) become PNG, under `{root}/PNG/`.
//! - Everything else becomes 8-bit RGB JPEG, under `{root}/JPEG/`.
//!
//! The source directory is only read. Files that fail to decode are logged
//! and recorded in the stage report.

mod decode;
mod encode;
mod metadata;

pub use decode::{decode, Decoded};
pub use encode::{write_jpeg, write_png, JPEG_QUALITY};
pub use metadata::{read_dpi, Dpi, PreservedMetadata};

use crate::core::files::reserve_unique_file;
use crate::core::report::{StageDetails, StageKind, StageReport};
use crate::core::scanner::{list_files, JobItem};
use crate::core::worker::WorkerPool;
use crate::error::{ItemError, SetupError};
use crate::progress::RunContext;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Output format of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalFormat {
    Jpeg,
    Png,
}

impl CanonicalFormat {
    pub const ALL: [CanonicalFormat; 2] = [CanonicalFormat::Jpeg, CanonicalFormat::Png];

    /// Pick the format for a decoded image
    pub fn for_image(image: &DynamicImage) -> Self {
        if image.color().has_alpha() {
            CanonicalFormat::Png
        } else {
            CanonicalFormat::Jpeg
        }
    }

    /// Name of the per-format subdirectory
    pub fn dir_name(&self) -> &'static str {
        match self {
            CanonicalFormat::Jpeg => "JPEG",
            CanonicalFormat::Png => "PNG",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            CanonicalFormat::Jpeg => "jpg",
            CanonicalFormat::Png => "png",
        }
    }
}

/// Sorts a directory of images into canonical formats
#[derive(Debug, Clone, Copy)]
pub struct FormatClassifier {
    workers: usize,
}

impl FormatClassifier {
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Classify every file directly inside `src` into `dst_root/{JPEG,PNG}`
    pub fn run(&self, src: &Path, dst_root: &Path, ctx: &RunContext) -> Result<StageReport, SetupError> {
        let items = list_files(src)?;
        fs::create_dir_all(dst_root).map_err(|source| SetupError::CreateDirectory {
            path: dst_root.to_path_buf(),
            source,
        })?;
        let pool = WorkerPool::new(self.workers)?;

        let run = pool.run(StageKind::FormatSeparation.label(), items, ctx, |item| {
            classify_one(item, dst_root)
        });

        let count = |format: CanonicalFormat| run.outcomes.iter().filter(|(_, f)| *f == format).count();
        let jpeg = count(CanonicalFormat::Jpeg);
        let png = count(CanonicalFormat::Png);
        info!(src = %src.display(), jpeg, png, "format separation finished");

        Ok(StageReport::from_run(
            StageKind::FormatSeparation,
            src,
            &run,
            StageDetails::Formats { jpeg, png },
        ))
    }
}

/// Decode one file and write its canonical re-encoding
fn classify_one(item: &JobItem, dst_root: &Path) -> Result<CanonicalFormat, ItemError> {
    let Decoded { image, icc_profile } = decode(&item.path)?;
    let format = CanonicalFormat::for_image(&image);

    let dir = dst_root.join(format.dir_name());
    fs::create_dir_all(&dir).map_err(|source| ItemError::Io {
        path: dir.clone(),
        source,
    })?;

    let name = format!("{}.{}", item.stem(), format.extension());
    let (target, file) = reserve_unique_file(&dir, &name).map_err(|source| ItemError::Io {
        path: dir.join(&name),
        source,
    })?;

    let metadata = PreservedMetadata {
        dpi: read_dpi(&item.path),
        icc_profile,
    };
    let mut writer = BufWriter::new(file);
    let written = match format {
        CanonicalFormat::Jpeg => write_jpeg(&image, &metadata, &mut writer),
        CanonicalFormat::Png => write_png(&image, &metadata, &mut writer),
    }
    .map_err(|e| e.to_string())
    .and_then(|()| writer.flush().map_err(|e| e.to_string()));

    if let Err(reason) = written {
        // Drop the half-written reservation
        drop(writer);
        let _ = fs::remove_file(&target);
        return Err(ItemError::Encode {
            path: item.path.clone(),
            reason,
        });
    }

    debug!(from = %item.name, to = %target.display(), ?format, "classified");
    Ok(format)
}

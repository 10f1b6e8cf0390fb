//! Canonical encoders.
//!
//! JPEG output is progressive 8-bit RGB with 4:2:0 chroma subsampling. PNG output keeps the source bit
//! depth (float images are narrowed to 16 bits). Both carry the DPI and ICC
//! profile read from the source.

use super::metadata::{Dpi, PreservedMetadata};
use crate::error::EncodeError;
use image::DynamicImage;
use jpeg_encoder::{ColorType as JpegColor, Density, Encoder, SamplingFactor};
use png::{AdaptiveFilterType, BitDepth, ColorType as PngColor, Compression, PixelDimensions, Unit};
use std::borrow::Cow;
use std::io::Write;
use tracing::debug;

/// JPEG quality used for every re-encoded image
pub const JPEG_QUALITY: u8 = 95;

const METERS_PER_INCH: f64 = 0.0254;

/// Write `image` as a progressive 8-bit RGB JPEG
pub fn write_jpeg<W: Write>(
    image: &DynamicImage,
    metadata: &PreservedMetadata,
    writer: W,
) -> Result<(), EncodeError> {
    let rgb = image.to_rgb8();
    let too_large = || EncodeError::TooLarge {
        width: rgb.width(),
        height: rgb.height(),
    };
    let width = u16::try_from(rgb.width()).map_err(|_| too_large())?;
    let height = u16::try_from(rgb.height()).map_err(|_| too_large())?;

    let mut encoder = Encoder::new(writer, JPEG_QUALITY);
    encoder.set_progressive(true);
    encoder.set_sampling_factor(SamplingFactor::R_4_2_0);
    if let Some(dpi) = metadata.dpi {
        encoder.set_density(Density::Inch { x: dpi.x, y: dpi.y });
    }
    if let Some(profile) = &metadata.icc_profile {
        if let Err(e) = encoder.add_icc_profile(profile) {
            debug!(error = %e, "ICC profile does not fit into APP2 segments, dropping it");
        }
    }

    encoder.encode(rgb.as_raw(), width, height, JpegColor::Rgb)?;
    Ok(())
}

/// Write `image` as a PNG at maximum compression
pub fn write_png<W: Write>(
    image: &DynamicImage,
    metadata: &PreservedMetadata,
    writer: W,
) -> Result<(), EncodeError> {
    let (color, depth, data) = png_samples(image);

    let mut info = png::Info::with_size(image.width(), image.height());
    info.icc_profile = metadata.icc_profile.as_deref().map(Cow::Borrowed);

    let mut encoder = png::Encoder::with_info(writer, info)?;
    encoder.set_color(color);
    encoder.set_depth(depth);
    encoder.set_compression(Compression::Best);
    encoder.set_adaptive_filter(AdaptiveFilterType::Adaptive);
    encoder.set_pixel_dims(metadata.dpi.map(pixel_dims));

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&data)?;
    png_writer.finish()?;
    Ok(())
}

/// pHYs only knows metres
fn pixel_dims(dpi: Dpi) -> PixelDimensions {
    let per_meter = |dots: u16| (f64::from(dots) / METERS_PER_INCH).round() as u32;
    PixelDimensions {
        xppu: per_meter(dpi.x),
        yppu: per_meter(dpi.y),
        unit: Unit::Meter,
    }
}

/// Raw PNG scanline bytes for `image`. 16-bit samples are big-endian.
fn png_samples(image: &DynamicImage) -> (PngColor, BitDepth, Vec<u8>) {
    match image {
        DynamicImage::ImageLuma8(buffer) => (PngColor::Grayscale, BitDepth::Eight, buffer.as_raw().clone()),
        DynamicImage::ImageLumaA8(buffer) => {
            (PngColor::GrayscaleAlpha, BitDepth::Eight, buffer.as_raw().clone())
        }
        DynamicImage::ImageRgb8(buffer) => (PngColor::Rgb, BitDepth::Eight, buffer.as_raw().clone()),
        DynamicImage::ImageRgba8(buffer) => (PngColor::Rgba, BitDepth::Eight, buffer.as_raw().clone()),
        DynamicImage::ImageLuma16(buffer) => (PngColor::Grayscale, BitDepth::Sixteen, big_endian(buffer.as_raw())),
        DynamicImage::ImageLumaA16(buffer) => {
            (PngColor::GrayscaleAlpha, BitDepth::Sixteen, big_endian(buffer.as_raw()))
        }
        DynamicImage::ImageRgb16(buffer) => (PngColor::Rgb, BitDepth::Sixteen, big_endian(buffer.as_raw())),
        DynamicImage::ImageRgba16(buffer) => (PngColor::Rgba, BitDepth::Sixteen, big_endian(buffer.as_raw())),
        DynamicImage::ImageRgb32F(_) => (PngColor::Rgb, BitDepth::Sixteen, big_endian(image.to_rgb16().as_raw())),
        _ => (PngColor::Rgba, BitDepth::Sixteen, big_endian(image.to_rgba16().as_raw())),
    }
}

fn big_endian(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|sample| sample.to_be_bytes()).collect()
}

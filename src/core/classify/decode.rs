//! Full image decoding.
//!
//! The decoder is picked from the file's leading bytes, never its
//! extension. JPEG goes through zune-jpeg in strict mode, so truncated or
//! corrupt files fail here instead of decoding to grey. Every other format
//! goes through the image crate with content sniffing.

use crate::error::ItemError;
use image::{DynamicImage, ImageBuffer, ImageDecoder, ImageReader, Luma, Rgb};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// SOI marker followed by the first marker prefix
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// A decoded image plus the ICC profile its container carried
pub struct Decoded {
    pub image: DynamicImage,
    pub icc_profile: Option<Vec<u8>>,
}

/// Decode `path` completely
pub fn decode(path: &Path) -> Result<Decoded, ItemError> {
    let file_bytes = fs::read(path).map_err(|source| ItemError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if file_bytes.starts_with(&JPEG_MAGIC) {
        decode_jpeg(path, &file_bytes)
    } else {
        decode_generic(path, &file_bytes)
    }
}

fn decode_jpeg(path: &Path, file_bytes: &[u8]) -> Result<Decoded, ItemError> {
    let options = DecoderOptions::default()
        .set_strict_mode(true)
        .jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(file_bytes, options);

    let pixels = decoder
        .decode()
        .map_err(|e| decode_error(path, format!("zune-jpeg decode failed: {:?}", e)))?;

    let info = decoder
        .info()
        .ok_or_else(|| decode_error(path, "Failed to get image info"))?;
    let width = info.width as u32;
    let height = info.height as u32;
    let icc_profile = decoder.icc_profile();

    let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
        ColorSpace::RGB => {
            let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
                .ok_or_else(|| decode_error(path, "Failed to create RGB buffer"))?;
            DynamicImage::ImageRgb8(buffer)
        }
        ColorSpace::Luma => {
            let buffer: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
                .ok_or_else(|| decode_error(path, "Failed to create Luma buffer"))?;
            DynamicImage::ImageLuma8(buffer)
        }
        _ => return decode_generic(path, file_bytes),
    };

    Ok(Decoded { image, icc_profile })
}

fn decode_generic(path: &Path, file_bytes: &[u8]) -> Result<Decoded, ItemError> {
    let reader = ImageReader::new(Cursor::new(file_bytes))
        .with_guessed_format()
        .map_err(|source| ItemError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| decode_error(path, e.to_string()))?;
    let icc_profile = decoder.icc_profile().ok().flatten();
    let image =
        DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e.to_string()))?;

    Ok(Decoded { image, icc_profile })
}

fn decode_error(path: &Path, reason: impl Into<String>) -> ItemError {
    ItemError::Decode {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn decodes_jpeg_through_fast_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.jpg");
        RgbImage::from_pixel(16, 8, Rgb([200, 10, 10])).save(&path).unwrap();

        let decoded = decode(&path).unwrap();

        assert_eq!(decoded.image.width(), 16);
        assert_eq!(decoded.image.height(), 8);
        assert!(!decoded.image.color().has_alpha());
    }

    #[test]
    fn decodes_png_with_alpha() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("icon.png");
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])).save(&path).unwrap();

        let decoded = decode(&path).unwrap();

        assert!(decoded.image.color().has_alpha());
    }

    #[test]
    fn sniffs_content_over_extension() {
        let temp_dir = TempDir::new().unwrap();
        let png = temp_dir.path().join("real.png");
        RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])).save(&png).unwrap();
        let mislabelled = temp_dir.path().join("really_png.bmp");
        fs::copy(&png, &mislabelled).unwrap();

        let decoded = decode(&mislabelled).unwrap();

        assert_eq!(decoded.image.width(), 2);
    }

    #[test]
    fn png_named_jpg_is_sniffed_as_png() {
        let temp_dir = TempDir::new().unwrap();
        let png = temp_dir.path().join("icon.png");
        RgbaImage::from_pixel(3, 3, Rgba([5, 6, 7, 8])).save(&png).unwrap();
        let mislabelled = temp_dir.path().join("icon.jpg");
        fs::copy(&png, &mislabelled).unwrap();

        let decoded = decode(&mislabelled).unwrap();

        assert_eq!(decoded.image.width(), 3);
        assert!(decoded.image.color().has_alpha());
    }

    #[test]
    fn jpeg_without_extension_uses_jpeg_path() {
        let temp_dir = TempDir::new().unwrap();
        let jpeg = temp_dir.path().join("photo.jpg");
        RgbImage::from_pixel(6, 2, Rgb([1, 200, 1])).save(&jpeg).unwrap();
        let bare = temp_dir.path().join("photo");
        fs::copy(&jpeg, &bare).unwrap();

        let decoded = decode(&bare).unwrap();

        assert_eq!(decoded.image.width(), 6);
        assert!(!decoded.image.color().has_alpha());
    }

    #[test]
    fn truncated_jpeg_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        RgbImage::from_pixel(64, 64, Rgb([9, 9, 9])).save(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..100]).unwrap();

        assert!(matches!(decode(&path), Err(ItemError::Decode { .. })));
    }

    #[test]
    fn garbage_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.png");
        fs::write(&path, b"definitely not an image").unwrap();

        assert!(decode(&path).is_err());
    }
}

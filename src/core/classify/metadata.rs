//! Metadata carried from the source file to the re-encoded file.
//!
//! Only two things survive re-encoding: the print resolution and the ICC
//! colour profile. Everything else in the source container is dropped.

use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Print resolution in dots per inch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dpi {
    pub x: u16,
    pub y: u16,
}

/// Metadata that survives re-encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedMetadata {
    pub dpi: Option<Dpi>,
    pub icc_profile: Option<Vec<u8>>,
}

// EXIF ResolutionUnit values
const UNIT_INCH: u16 = 2;
const UNIT_CENTIMETER: u16 = 3;

/// Read the resolution from a file's EXIF block, if it has one
pub fn read_dpi(path: &Path) -> Option<Dpi> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(&file);
    let exif_reader = Reader::new().read_from_container(&mut bufreader).ok()?;

    let x = exif_reader
        .get_field(Tag::XResolution, In::PRIMARY)
        .and_then(|f| get_rational_value(&f.value))?;
    let y = exif_reader
        .get_field(Tag::YResolution, In::PRIMARY)
        .and_then(|f| get_rational_value(&f.value))
        .unwrap_or(x);
    let unit = exif_reader
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|f| get_u16_value(&f.value))
        .unwrap_or(UNIT_INCH);

    dpi_from_resolution(x, y, unit)
}

/// Convert EXIF resolution values to DPI. Unitless resolutions carry no
/// print size and are dropped.
fn dpi_from_resolution(x: f64, y: f64, unit: u16) -> Option<Dpi> {
    let scale = match unit {
        UNIT_INCH => 1.0,
        UNIT_CENTIMETER => 2.54,
        _ => return None,
    };
    let to_dpi = |v: f64| {
        let dpi = (v * scale).round();
        (dpi >= 1.0 && dpi <= u16::MAX as f64).then_some(dpi as u16)
    };
    Some(Dpi {
        x: to_dpi(x)?,
        y: to_dpi(y)?,
    })
}

fn get_rational_value(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(vec) => vec.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        _ => None,
    }
}

fn get_u16_value(value: &Value) -> Option<u16> {
    match value {
        Value::Short(vec) => vec.first().copied(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inch_resolution_passes_through() {
        assert_eq!(
            dpi_from_resolution(300.0, 300.0, UNIT_INCH),
            Some(Dpi { x: 300, y: 300 })
        );
    }

    #[test]
    fn centimeter_resolution_converts() {
        assert_eq!(
            dpi_from_resolution(118.0, 118.0, UNIT_CENTIMETER),
            Some(Dpi { x: 300, y: 300 })
        );
    }

    #[test]
    fn unitless_resolution_is_dropped() {
        assert_eq!(dpi_from_resolution(1.0, 1.0, 1), None);
    }

    #[test]
    fn file_without_exif_has_no_dpi() {
        assert_eq!(read_dpi(Path::new("/nonexistent/file.jpg")), None);
    }
}

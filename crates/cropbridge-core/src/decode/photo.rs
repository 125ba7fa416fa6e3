//! Orientation lookup from the photo a sidecar belongs to.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use exif::{In, Reader, Tag};

use super::types::DecodeError;
use crate::geometry::Orientation;

/// Photo extensions probed next to a sidecar, in order.
const IMAGE_EXTENSIONS: &[&str] = &[
    "heic", "HEIC", "jpg", "JPG", "jpeg", "JPEG", "dng", "DNG", "tif", "TIF", "tiff", "TIFF",
];

/// Read the EXIF orientation of an image file.
///
/// Returns `Ok(None)` when the file has no orientation tag.
///
/// # Errors
///
/// `DecodeError::Io` if the file cannot be opened, `DecodeError::Exif` if
/// it carries no readable EXIF container.
pub fn read_orientation(path: &Path) -> Result<Option<Orientation>, DecodeError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| DecodeError::Exif(e.to_string()))?;
    Ok(orientation_from_exif(&exif))
}

/// Read the EXIF orientation from in-memory image bytes.
pub fn read_orientation_from_bytes(bytes: &[u8]) -> Result<Option<Orientation>, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new()
        .read_from_container(&mut cursor)
        .map_err(|e| DecodeError::Exif(e.to_string()))?;
    Ok(orientation_from_exif(&exif))
}

fn orientation_from_exif(exif: &exif::Exif) -> Option<Orientation> {
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from)
}

/// Find the photo sharing a sidecar's file stem, if one exists.
pub fn sibling_image(sidecar: &Path) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| sidecar.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

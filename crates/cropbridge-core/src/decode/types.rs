//! Core types for source sidecar decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{CropError, CropRect, ImageSize, Orientation, Point};

/// Error types for sidecar decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The sidecar is not well-formed XML.
    #[error("Invalid XMP: {0}")]
    InvalidXml(String),

    /// The sidecar carries no embedded edit model.
    #[error("No edit model found")]
    MissingEditModel,

    /// The embedded property list could not be decoded.
    #[error("Invalid property list: {0}")]
    InvalidPlist(String),

    /// The edit model or crop adjustment is not valid JSON.
    #[error("Invalid edit model JSON: {0}")]
    InvalidJson(String),

    /// Neither the property list nor the XMP states the original image size.
    #[error("No original image size found")]
    MissingImageSize,

    /// The original image size could not be parsed.
    #[error("Invalid original image size: {0}")]
    InvalidImageSize(#[from] CropError),

    /// No version of the edit model contains a crop adjustment.
    #[error("No crop data found")]
    NoCropAdjustment,

    /// The crop adjustment exists but is switched off.
    #[error("Crop adjustment is disabled")]
    CropDisabled,

    /// EXIF parsing error.
    #[error("EXIF error: {0}")]
    Exif(String),

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The crop adjustment as stored by the source editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NitroCrop {
    /// Lower-left corner, bottom-left-origin pixels.
    pub origin: Point,
    /// Width and height in pixels; `(0, 0)` means full frame.
    pub size: (f64, f64),
    /// Straighten angle in degrees.
    pub straighten: f64,
}

impl NitroCrop {
    /// Build the validated geometry for this crop.
    pub fn to_rect(&self, image: ImageSize) -> Result<CropRect, CropError> {
        CropRect::new(self.origin, self.size, self.straighten, image)
    }
}

/// Everything the conversion needs from a decoded edit model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditModel {
    /// Full original image size, if the property list states it.
    pub image_size: Option<ImageSize>,
    /// The most recent crop adjustment.
    pub crop: NitroCrop,
}

/// Values pulled from a source XMP sidecar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NitroXmp {
    /// Unescaped edit model payload (a property list).
    pub edit_model: Option<String>,
    /// `nitro:OriginalPixelSize`, as written.
    pub original_pixel_size: Option<String>,
    /// `tiff:Orientation`, if present.
    pub orientation: Option<Orientation>,
}

impl NitroXmp {
    /// Check if the sidecar was written by the source editor.
    pub fn is_nitro(&self) -> bool {
        self.edit_model.is_some()
    }
}

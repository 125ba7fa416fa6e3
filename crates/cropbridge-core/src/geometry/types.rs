//! Core types for crop geometry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for crop geometry construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CropError {
    /// A dimension, coordinate or angle is out of its valid domain.
    #[error("Malformed crop input: {0}")]
    MalformedInput(String),

    /// The rectangle collapsed to a point without being the full-frame sentinel.
    #[error("Degenerate crop geometry: {0}")]
    DegenerateGeometry(String),
}

/// Full original image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parse `"{6960, 4640}"` (property list form) or `"6960x4640"`.
impl FromStr for ImageSize {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (w, h) = if let Some(inner) = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            inner.split_once(',')
        } else {
            trimmed.split_once(['x', 'X'])
        }
        .ok_or_else(|| CropError::MalformedInput(format!("unrecognized image size {s:?}")))?;

        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| CropError::MalformedInput(format!("image size {s:?}: {e}")))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

/// A typed value of a single camera-raw-settings attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrsValue {
    Real(f64),
    Integer(i64),
    Bool(bool),
}

impl CrsValue {
    /// Serialize for an XMP attribute, floats at a fixed decimal precision.
    pub fn format(&self, precision: usize) -> String {
        match self {
            CrsValue::Real(v) => format!("{v:.precision$}"),
            CrsValue::Integer(v) => v.to_string(),
            CrsValue::Bool(true) => "True".to_string(),
            CrsValue::Bool(false) => "False".to_string(),
        }
    }
}

/// Attribute names written to the destination sidecar, in output order.
pub const CROP_LEFT: &str = "crs:CropLeft";
pub const CROP_TOP: &str = "crs:CropTop";
pub const CROP_RIGHT: &str = "crs:CropRight";
pub const CROP_BOTTOM: &str = "crs:CropBottom";
pub const CROP_ANGLE: &str = "crs:CropAngle";
pub const CROP_CONSTRAIN_TO_WARP: &str = "crs:CropConstrainToWarp";
pub const CROP_CONSTRAIN_TO_UNIT_SQUARE: &str = "crs:CropConstrainToUnitSquare";
pub const HAS_CROP: &str = "crs:HasCrop";

/// Normalized crop box in the destination convention.
///
/// Fractions are relative to the full image, origin top-left. They are
/// conventionally within `[0, 1]` but never clamped here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrsCrop {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    /// Straighten angle in degrees, passed through from the source edit.
    pub angle: f64,
    pub has_crop: bool,
    /// Always 0: the crop never warps the aspect ratio.
    pub constrain_to_warp: i64,
    /// Always 1: the crop is kept inside the unit square.
    pub constrain_to_unit_square: i64,
}

impl CrsCrop {
    /// Assemble a crop box with the fixed conformance flags.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64, angle: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            angle,
            has_crop: true,
            constrain_to_warp: 0,
            constrain_to_unit_square: 1,
        }
    }

    /// The four box fractions as `[left, top, right, bottom]`.
    pub fn edges(&self) -> [f64; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    /// Field name to value map consumed by the sidecar patcher.
    pub fn fields(&self) -> [(&'static str, CrsValue); 8] {
        [
            (CROP_LEFT, CrsValue::Real(self.left)),
            (CROP_TOP, CrsValue::Real(self.top)),
            (CROP_RIGHT, CrsValue::Real(self.right)),
            (CROP_BOTTOM, CrsValue::Real(self.bottom)),
            (CROP_ANGLE, CrsValue::Real(self.angle)),
            (CROP_CONSTRAIN_TO_WARP, CrsValue::Integer(self.constrain_to_warp)),
            (
                CROP_CONSTRAIN_TO_UNIT_SQUARE,
                CrsValue::Integer(self.constrain_to_unit_square),
            ),
            (HAS_CROP, CrsValue::Bool(self.has_crop)),
        ]
    }
}

//! Orientation-dependent relabeling of a finished crop box.
//!
//! The geometry engine works in the sensor frame. For captures whose
//! orientation flag says the sensor was turned, the destination expects
//! the box in the turned frame, so the four fractions are permuted without
//! recomputing any geometry.
//!
//! Supported orientations live in [`REMAP_TABLE`]. Adding one is a new row
//! there; only permutations verified against real captures belong in it.

use serde::{Deserialize, Serialize};

use super::types::CrsCrop;

/// EXIF/TIFF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise. Portrait capture on a landscape sensor.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

impl Orientation {
    /// Parse the textual flag found in sidecars (`"6"`).
    ///
    /// Unparseable text yields `None`; unknown numbers map to `Normal`.
    pub fn parse_flag(text: &str) -> Option<Self> {
        text.trim().parse::<u32>().ok().map(Self::from)
    }
}

/// A relabeling of the four box fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxRemap {
    /// Quarter turn clockwise of the unit square:
    /// `(left, top, right, bottom) -> (1 - bottom, left, 1 - top, right)`.
    QuarterTurnClockwise,
}

impl BoxRemap {
    /// Apply the permutation to a crop box, leaving angle and flags intact.
    pub fn apply(self, crop: CrsCrop) -> CrsCrop {
        match self {
            BoxRemap::QuarterTurnClockwise => CrsCrop {
                left: 1.0 - crop.bottom,
                top: crop.left,
                right: 1.0 - crop.top,
                bottom: crop.right,
                ..crop
            },
        }
    }
}

/// Orientation flag values that need their crop box relabeled.
pub const REMAP_TABLE: &[(Orientation, BoxRemap)] =
    &[(Orientation::Rotate90CW, BoxRemap::QuarterTurnClockwise)];

/// Look up the box permutation for an orientation, if any.
pub fn remap_for(orientation: Orientation) -> Option<BoxRemap> {
    REMAP_TABLE
        .iter()
        .find(|(entry, _)| *entry == orientation)
        .map(|(_, remap)| *remap)
}

impl CrsCrop {
    /// Relabel the box for the capture orientation.
    ///
    /// Orientations without a table entry pass through unchanged.
    pub fn oriented(self, orientation: Orientation) -> CrsCrop {
        match remap_for(orientation) {
            Some(remap) => remap.apply(self),
            None => self,
        }
    }
}

//! Crop geometry: from a source crop rectangle and straighten angle to a
//! normalized camera-raw crop box.
//!
//! # Coordinate Systems
//!
//! - Source rectangles are in pixels, origin at the bottom-left corner,
//!   described by the lower-left corner plus width and height
//! - Source straighten angles turn opposite to the destination's, so the
//!   engine rotates by the negated angle
//! - Destination boxes are fractions of the full image (0.0 to 1.0),
//!   origin at the top-left corner
//!
//! # Pipeline
//!
//! 1. [`CropRect::new`] validates and resolves the full-frame sentinel
//! 2. [`CropRect::crop_factors`] rotates, fits, scales and normalizes
//! 3. [`CrsCrop::oriented`] relabels the box for rotated-sensor captures
//!
//! Everything here is pure and allocation-free, so conversions can run on
//! any number of threads at once.

mod orientation;
mod point;
mod rect;
mod types;

pub use orientation::{remap_for, BoxRemap, Orientation, REMAP_TABLE};
pub use point::Point;
pub use rect::CropRect;
pub use types::{
    CropError, CrsCrop, CrsValue, ImageSize, CROP_ANGLE, CROP_BOTTOM, CROP_CONSTRAIN_TO_UNIT_SQUARE,
    CROP_CONSTRAIN_TO_WARP, CROP_LEFT, CROP_RIGHT, CROP_TOP, HAS_CROP,
};

//! Source sidecar decoding.
//!
//! This module provides functionality for:
//! - Pulling the embedded edit model, original size and orientation out of
//!   a source XMP sidecar
//! - Decoding the edit model property list and its nested JSON down to the
//!   crop adjustment
//! - Reading the orientation of the photo itself when no sidecar states it
//!
//! # Examples
//!
//! ```ignore
//! use cropbridge_core::decode::{parse_edit_model, read_nitro_xmp};
//!
//! let xml = std::fs::read_to_string("IMG_0001.xmp")?;
//! let xmp = read_nitro_xmp(&xml)?;
//! let model = parse_edit_model(xmp.edit_model.as_deref().unwrap())?;
//! println!("crop rect {:?} at {}°", model.crop.size, model.crop.straighten);
//! ```

mod edit_model;
mod photo;
mod types;
mod xmp;

pub use edit_model::{find_crop, parse_crop_json, parse_edit_model};
pub use photo::{read_orientation, read_orientation_from_bytes, sibling_image};
pub use types::{DecodeError, EditModel, NitroCrop, NitroXmp};
pub use xmp::read_nitro_xmp;

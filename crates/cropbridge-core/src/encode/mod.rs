//! Destination sidecar patching for cropbridge.
//!
//! This module provides functionality for:
//! - Writing a camera-raw crop box into an existing XMP sidecar
//! - Reading back the crop box and orientation a sidecar already holds
//!
//! The sidecar is edited as text, so unrelated settings and formatting
//! survive untouched.
//!
//! # Examples
//!
//! ```ignore
//! use cropbridge_core::encode::patch_crop;
//! use cropbridge_core::CrsCrop;
//!
//! let xmp = std::fs::read_to_string("IMG_0001.xmp")?;
//! let crop = CrsCrop::new(0.1, 0.1, 0.9, 0.9, 0.0);
//! std::fs::write("IMG_0001.xmp", patch_crop(&xmp, &crop, 6)?)?;
//! ```

mod crs;

pub use crs::{patch_crop, read_crop, read_orientation, PatchError};

//! Cropbridge Core - crop conversion library
//!
//! This crate converts the crop and straighten edit stored in a Nitro
//! sidecar into the normalized camera-raw crop box of an Adobe sidecar,
//! including edit-model decoding, crop geometry, orientation remapping and
//! in-place sidecar patching.

pub mod batch;
pub mod convert;
pub mod decode;
pub mod encode;
pub mod geometry;

pub use batch::{convert_directory, pair_directories, BatchError, BatchReport, FilePair};
pub use convert::{
    convert_file, read_source, resolve_orientation, Conversion, ConvertError, ConvertOptions,
    SourceEdit,
};
pub use geometry::{CropError, CropRect, CrsCrop, ImageSize, Orientation, Point};

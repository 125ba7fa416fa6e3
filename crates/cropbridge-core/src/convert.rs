//! Single sidecar conversion: decode the source, compute the crop box,
//! orient it and patch the destination.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::decode::{
    self, parse_edit_model, read_nitro_xmp, sibling_image, DecodeError, NitroCrop,
};
use crate::encode::{self, patch_crop, PatchError};
use crate::geometry::{CropError, CrsCrop, ImageSize, Orientation};

/// Error types for a single conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A sidecar could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source sidecar could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The decoded rectangle is unusable.
    #[error(transparent)]
    Crop(#[from] CropError),

    /// The destination sidecar could not be patched.
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Conversion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Decimal places for floating-point fields.
    pub precision: usize,
    /// Compute everything but leave the destination untouched.
    pub dry_run: bool,
    /// Read EXIF orientation from the photo next to a sidecar when neither
    /// sidecar states one.
    pub probe_image_orientation: bool,
    /// Remap the crop box for the image orientation.
    pub apply_orientation: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            precision: 6,
            dry_run: false,
            probe_image_orientation: true,
            apply_orientation: true,
        }
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub image_size: ImageSize,
    pub orientation: Option<Orientation>,
    /// The crop box as written, after orientation remapping.
    pub crop: CrsCrop,
    /// Whether the destination file was rewritten.
    pub written: bool,
}

/// The crop edit carried by a source sidecar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceEdit {
    pub image_size: ImageSize,
    pub crop: NitroCrop,
    /// `tiff:Orientation` of the source sidecar, if stated.
    pub orientation: Option<Orientation>,
}

/// Decode the crop edit from the text of a source sidecar.
///
/// The image size comes from the edit model, falling back to the
/// sidecar's `nitro:OriginalPixelSize`.
pub fn read_source(text: &str) -> Result<SourceEdit, DecodeError> {
    let xmp = read_nitro_xmp(text)?;
    let payload = xmp
        .edit_model
        .as_deref()
        .ok_or(DecodeError::MissingEditModel)?;
    let model = parse_edit_model(payload)?;

    let image_size = match model.image_size {
        Some(size) => size,
        None => xmp
            .original_pixel_size
            .as_deref()
            .ok_or(DecodeError::MissingImageSize)?
            .parse::<ImageSize>()?,
    };

    Ok(SourceEdit {
        image_size,
        crop: model.crop,
        orientation: xmp.orientation,
    })
}

/// Convert the crop of one source sidecar into one destination sidecar.
///
/// The destination must already exist; only its crop attributes change.
///
/// # Errors
///
/// Returns an error if either file cannot be read, the source has no
/// usable crop, or the destination has no attributes to patch.
pub fn convert_file(
    source: &Path,
    destination: &Path,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let edit = read_source(&read_text(source)?)?;
    let image_size = edit.image_size;
    let crop = edit.crop.to_rect(image_size)?.crop_factors();

    let destination_text = read_text(destination)?;
    let orientation = resolve_orientation(
        edit.orientation,
        source,
        Some((destination, destination_text.as_str())),
        options.probe_image_orientation,
    );

    let crop = match orientation {
        Some(orientation) if options.apply_orientation => crop.oriented(orientation),
        _ => crop,
    };
    debug!(?orientation, ?crop, "oriented crop");

    let patched = patch_crop(&destination_text, &crop, options.precision)?;
    let written = !options.dry_run;
    if written {
        fs::write(destination, patched).map_err(|source| ConvertError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
    }

    info!(
        source = %source.display(),
        destination = %destination.display(),
        size = %image_size,
        left = crop.left,
        top = crop.top,
        right = crop.right,
        bottom = crop.bottom,
        angle = crop.angle,
        dry_run = options.dry_run,
        "converted crop"
    );

    Ok(Conversion {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        image_size,
        orientation,
        crop,
        written,
    })
}

fn read_text(path: &Path) -> Result<String, ConvertError> {
    fs::read_to_string(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Orientation a crop box is written in: the source sidecar's `stated`
/// value, else the destination sidecar's, else the EXIF of a photo next to
/// the destination or the source when `probe_image` is set.
///
/// `destination` is the destination path with its text, when there is one.
pub fn resolve_orientation(
    stated: Option<Orientation>,
    source: &Path,
    destination: Option<(&Path, &str)>,
    probe_image: bool,
) -> Option<Orientation> {
    stated
        .or_else(|| destination.and_then(|(_, text)| encode::read_orientation(text)))
        .or_else(|| {
            if !probe_image {
                return None;
            }
            let sidecars: Vec<&Path> = destination
                .map(|(path, _)| path)
                .into_iter()
                .chain([source])
                .collect();
            probe_orientation(&sidecars)
        })
}

/// First EXIF orientation found in a photo next to any of the sidecars.
fn probe_orientation(sidecars: &[&Path]) -> Option<Orientation> {
    sidecars.iter().filter_map(|s| sibling_image(s)).find_map(|image| {
        match decode::read_orientation(&image) {
            Ok(orientation) => orientation,
            Err(e) => {
                debug!(image = %image.display(), error = %e, "no usable EXIF orientation");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::read_crop;

    const EDIT_MODEL_PLIST: &str = r#"<plist version="1.0"><dict>
<key>originalImagePixelSize</key><string>{10, 10}</string>
<key>editModel</key><string>{"versions":[{"adjDataArr":[{"id":"Crop","json":{"cropRect":[[2,2],[4,6]],"numeric":{"straighten":0}}}]}]}</string>
</dict></plist>"#;

    const DESTINATION: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    crs:Version="15.0"
    crs:HasCrop="False"
    crs:AlreadyApplied="False"/>
 </rdf:RDF>
</x:xmpmeta>
"#;

    // Minimal little-endian TIFF: one IFD holding Orientation = 6
    const TIFF_ROTATED: &[u8] = &[
        0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x12, 0x01, 0x03, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    fn source_xmp(plist: &str, extra: &str) -> String {
        format!(
            "<x:xmpmeta><rdf:RDF><rdf:Description {extra} nitro:EditModel=\"{}\"/></rdf:RDF></x:xmpmeta>",
            quick_xml::escape::escape(plist)
        )
    }

    fn assert_edges(crop: &CrsCrop, expected: [f64; 4], tolerance: f64) {
        for (actual, want) in crop.edges().iter().zip(expected) {
            assert!(
                (actual - want).abs() < tolerance,
                "edges {:?} != {:?}",
                crop.edges(),
                expected
            );
        }
    }

    fn write_pair(dir: &Path, source: &str, destination: &str) -> (PathBuf, PathBuf) {
        let source_dir = dir.join("nitro");
        let destination_dir = dir.join("adobe");
        fs::create_dir_all(&source_dir).unwrap();
        fs::create_dir_all(&destination_dir).unwrap();
        let source_path = source_dir.join("IMG_0001.xmp");
        let destination_path = destination_dir.join("IMG_0001.xmp");
        fs::write(&source_path, source).unwrap();
        fs::write(&destination_path, destination).unwrap();
        (source_path, destination_path)
    }

    #[test]
    fn test_default_options() {
        let options = ConvertOptions::default();
        assert_eq!(options.precision, 6);
        assert!(!options.dry_run);
        assert!(options.probe_image_orientation);
        assert!(options.apply_orientation);
    }

    #[test]
    fn test_options_fill_missing_fields() {
        let options: ConvertOptions = serde_json::from_str(r#"{"precision": 4}"#).unwrap();
        assert_eq!(options.precision, 4);
        assert!(options.apply_orientation);
    }

    #[test]
    fn test_convert_file_writes_crop() {
        let dir = tempfile::tempdir().unwrap();
        let (source, destination) =
            write_pair(dir.path(), &source_xmp(EDIT_MODEL_PLIST, ""), DESTINATION);

        let conversion = convert_file(&source, &destination, &ConvertOptions::default()).unwrap();
        assert!(conversion.written);
        assert_eq!(conversion.image_size, ImageSize::new(10, 10));
        assert_eq!(conversion.orientation, None);
        assert_edges(&conversion.crop, [0.2, 0.2, 0.6, 0.8], 1e-12);

        let written = fs::read_to_string(&destination).unwrap();
        assert!(written.contains("crs:CropLeft=\"0.200000\""));
        assert!(written.contains("crs:CropBottom=\"0.800000\""));
        assert!(written.contains("crs:HasCrop=\"True\""));
        assert_edges(&read_crop(&written).unwrap(), [0.2, 0.2, 0.6, 0.8], 1e-12);
    }

    #[test]
    fn test_dry_run_leaves_destination() {
        let dir = tempfile::tempdir().unwrap();
        let (source, destination) =
            write_pair(dir.path(), &source_xmp(EDIT_MODEL_PLIST, ""), DESTINATION);

        let options = ConvertOptions {
            dry_run: true,
            ..Default::default()
        };
        let conversion = convert_file(&source, &destination, &options).unwrap();
        assert!(!conversion.written);
        assert_eq!(fs::read_to_string(&destination).unwrap(), DESTINATION);
    }

    #[test]
    fn test_source_orientation_remaps_crop() {
        let dir = tempfile::tempdir().unwrap();
        let source_text = source_xmp(EDIT_MODEL_PLIST, "tiff:Orientation=\"6\"");
        let (source, destination) = write_pair(dir.path(), &source_text, DESTINATION);

        let conversion = convert_file(&source, &destination, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.orientation, Some(Orientation::Rotate90CW));
        // (1 - bottom, left, 1 - top, right)
        assert_edges(&conversion.crop, [0.2, 0.2, 0.8, 0.6], 1e-12);
    }

    #[test]
    fn test_orientation_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let source_text = source_xmp(EDIT_MODEL_PLIST, "tiff:Orientation=\"6\"");
        let (source, destination) = write_pair(dir.path(), &source_text, DESTINATION);

        let options = ConvertOptions {
            apply_orientation: false,
            ..Default::default()
        };
        let conversion = convert_file(&source, &destination, &options).unwrap();
        assert_eq!(conversion.orientation, Some(Orientation::Rotate90CW));
        assert_edges(&conversion.crop, [0.2, 0.2, 0.6, 0.8], 1e-12);
    }

    #[test]
    fn test_destination_orientation_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let destination_text = DESTINATION.replace(
            "    crs:Version",
            "    tiff:Orientation=\"8\"\n    crs:Version",
        );
        let (source, destination) = write_pair(
            dir.path(),
            &source_xmp(EDIT_MODEL_PLIST, ""),
            &destination_text,
        );

        let conversion = convert_file(&source, &destination, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.orientation, Some(Orientation::Rotate270CW));
        // only quarter-turn clockwise is remapped
        assert_edges(&conversion.crop, [0.2, 0.2, 0.6, 0.8], 1e-12);
    }

    #[test]
    fn test_sibling_image_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let (source, destination) =
            write_pair(dir.path(), &source_xmp(EDIT_MODEL_PLIST, ""), DESTINATION);
        fs::write(destination.with_extension("tif"), TIFF_ROTATED).unwrap();

        let conversion = convert_file(&source, &destination, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.orientation, Some(Orientation::Rotate90CW));

        let options = ConvertOptions {
            probe_image_orientation: false,
            ..Default::default()
        };
        let conversion = convert_file(&source, &destination, &options).unwrap();
        assert_eq!(conversion.orientation, None);
    }

    #[test]
    fn test_image_size_from_xmp_attribute() {
        let plist = EDIT_MODEL_PLIST.replace(
            "<key>originalImagePixelSize</key><string>{10, 10}</string>",
            "",
        );
        let dir = tempfile::tempdir().unwrap();
        let source_text = source_xmp(&plist, "nitro:OriginalPixelSize=\"{20, 10}\"");
        let (source, destination) = write_pair(dir.path(), &source_text, DESTINATION);

        let conversion = convert_file(&source, &destination, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.image_size, ImageSize::new(20, 10));
    }

    #[test]
    fn test_missing_image_size() {
        let plist = EDIT_MODEL_PLIST.replace(
            "<key>originalImagePixelSize</key><string>{10, 10}</string>",
            "",
        );
        let dir = tempfile::tempdir().unwrap();
        let (source, destination) = write_pair(dir.path(), &source_xmp(&plist, ""), DESTINATION);

        let err = convert_file(&source, &destination, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Decode(DecodeError::MissingImageSize)));
    }

    #[test]
    fn test_source_without_edit_model() {
        let dir = tempfile::tempdir().unwrap();
        let (source, destination) = write_pair(dir.path(), DESTINATION, DESTINATION);

        let err = convert_file(&source, &destination, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Decode(DecodeError::MissingEditModel)));
        assert_eq!(fs::read_to_string(&destination).unwrap(), DESTINATION);
    }

    #[test]
    fn test_missing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let (source, destination) =
            write_pair(dir.path(), &source_xmp(EDIT_MODEL_PLIST, ""), DESTINATION);
        fs::remove_file(&destination).unwrap();

        let err = convert_file(&source, &destination, &ConvertOptions::default()).unwrap_err();
        match err {
            ConvertError::Io { path, .. } => assert_eq!(path, destination),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_rect() {
        let plist = EDIT_MODEL_PLIST.replace("[[2,2],[4,6]]", "[[2,2],[0,0]]");
        let dir = tempfile::tempdir().unwrap();
        let (source, destination) = write_pair(dir.path(), &source_xmp(&plist, ""), DESTINATION);

        let err = convert_file(&source, &destination, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Crop(CropError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_resolve_orientation_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("IMG_0001.xmp");
        let destination = dir.path().join("adobe.xmp");
        let tagged = "<x tiff:Orientation=\"8\"/>";

        assert_eq!(
            resolve_orientation(
                Some(Orientation::Normal),
                &source,
                Some((destination.as_path(), tagged)),
                true
            ),
            Some(Orientation::Normal)
        );
        assert_eq!(
            resolve_orientation(None, &source, Some((destination.as_path(), tagged)), true),
            Some(Orientation::Rotate270CW)
        );
        assert_eq!(resolve_orientation(None, &source, None, true), None);

        fs::write(dir.path().join("IMG_0001.tif"), TIFF_ROTATED).unwrap();
        assert_eq!(
            resolve_orientation(None, &source, None, true),
            Some(Orientation::Rotate90CW)
        );
        assert_eq!(resolve_orientation(None, &source, None, false), None);
    }
}

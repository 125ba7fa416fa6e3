//! Decoding of the embedded edit model: a property list whose `editModel`
//! entry holds JSON, whose crop adjustment holds JSON again.
//!
//! ```text
//! plist
//! ├── originalImagePixelSize   "{6960, 4640}"
//! └── editModel                JSON string
//!     └── versions[]
//!         └── adjDataArr[]     { "id": "Crop", "json": ... }
//!             └── json         { "cropRect": [[x, y], [w, h]],
//!                                "numeric": { "straighten": deg },
//!                                "enabled": bool }
//! ```

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::debug;

use super::types::{DecodeError, EditModel, NitroCrop};
use crate::geometry::{ImageSize, Point};

const ORIGINAL_SIZE_KEY: &str = "originalImagePixelSize";
const EDIT_MODEL_KEY: &str = "editModel";
const CROP_ADJUSTMENT_ID: &str = "Crop";

#[derive(Debug, Deserialize)]
struct EditModelJson {
    #[serde(default)]
    versions: Vec<VersionJson>,
}

#[derive(Debug, Deserialize)]
struct VersionJson {
    #[serde(rename = "adjDataArr", default)]
    adjustments: Vec<AdjustmentJson>,
}

#[derive(Debug, Deserialize)]
struct AdjustmentJson {
    id: String,
    #[serde(default)]
    json: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CropJson {
    #[serde(rename = "cropRect")]
    crop_rect: [[f64; 2]; 2],
    #[serde(default)]
    numeric: NumericJson,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct NumericJson {
    #[serde(default)]
    straighten: f64,
}

fn enabled_by_default() -> bool {
    true
}

/// Decode an edit model payload taken from a source sidecar.
///
/// The payload is a property list in XML or binary form; binary lists are
/// expected base64-encoded since they travel inside XML text.
///
/// # Errors
///
/// - `DecodeError::InvalidPlist` if the property list cannot be read or
///   lacks an `editModel` entry
/// - `DecodeError::InvalidJson` if the edit model or crop JSON is malformed
/// - `DecodeError::NoCropAdjustment` if no version holds a crop
/// - `DecodeError::CropDisabled` if the latest crop is switched off
/// - `DecodeError::InvalidImageSize` if `originalImagePixelSize` is garbled
pub fn parse_edit_model(payload: &str) -> Result<EditModel, DecodeError> {
    let bytes = plist_bytes(payload)?;
    let plist = plist::Value::from_reader(Cursor::new(bytes))
        .map_err(|e| DecodeError::InvalidPlist(e.to_string()))?;
    let dict = plist
        .as_dictionary()
        .ok_or_else(|| DecodeError::InvalidPlist("root is not a dictionary".to_string()))?;

    let image_size = dict
        .get(ORIGINAL_SIZE_KEY)
        .and_then(|v| v.as_string())
        .map(str::parse::<ImageSize>)
        .transpose()?;

    let edit_model = match dict.get(EDIT_MODEL_KEY) {
        Some(plist::Value::String(s)) => s.clone(),
        Some(plist::Value::Data(d)) => String::from_utf8(d.clone())
            .map_err(|e| DecodeError::InvalidJson(format!("editModel is not UTF-8: {e}")))?,
        Some(_) => {
            return Err(DecodeError::InvalidJson(
                "editModel is not a JSON string".to_string(),
            ))
        }
        None => {
            return Err(DecodeError::InvalidPlist(
                "no editModel entry in property list".to_string(),
            ))
        }
    };

    let crop = find_crop(&edit_model)?;
    debug!(?image_size, ?crop, "decoded edit model");

    Ok(EditModel { image_size, crop })
}

/// Find the crop adjustment of the most recent version that has one.
pub fn find_crop(edit_model_json: &str) -> Result<NitroCrop, DecodeError> {
    let model: EditModelJson = serde_json::from_str(edit_model_json)
        .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let adjustment = model
        .versions
        .iter()
        .filter_map(|version| {
            version
                .adjustments
                .iter()
                .find(|adj| adj.id == CROP_ADJUSTMENT_ID)
        })
        .last()
        .ok_or(DecodeError::NoCropAdjustment)?;

    parse_crop_json(&adjustment.json)
}

/// Decode one crop adjustment, stored either as a JSON object or as a
/// string holding JSON.
pub fn parse_crop_json(value: &serde_json::Value) -> Result<NitroCrop, DecodeError> {
    let crop: CropJson = match value {
        serde_json::Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    }
    .map_err(|e| DecodeError::InvalidJson(format!("crop adjustment: {e}")))?;

    if !crop.enabled {
        return Err(DecodeError::CropDisabled);
    }

    let [[x, y], [w, h]] = crop.crop_rect;
    Ok(NitroCrop {
        origin: Point::new(x, y),
        size: (w, h),
        straighten: crop.numeric.straighten,
    })
}

fn plist_bytes(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = payload.trim();
    if trimmed.starts_with('<') {
        return Ok(trimmed.as_bytes().to_vec());
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| {
        DecodeError::InvalidPlist(format!("payload is neither XML nor base64: {e}"))
    })
}

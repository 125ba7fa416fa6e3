//! Text-level patching of camera-raw-settings attributes in a destination
//! XMP sidecar.
//!
//! The destination file is edited as text rather than re-serialized, so
//! everything outside the touched attributes stays byte-identical.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{
    CrsCrop, Orientation, CROP_ANGLE, CROP_BOTTOM, CROP_LEFT, CROP_RIGHT, CROP_TOP, HAS_CROP,
};

/// Any `crs:Name="value"` attribute.
static CRS_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bcrs:(\w+)="([^"]*)""#)
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// A `crs:` attribute that ends its line.
static CRS_ATTRIBUTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bcrs:[^=\s]+="[^"]*"(\r?\n)"#)
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// `tiff:Orientation` as attribute or element.
static TIFF_ORIENTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\btiff:Orientation(?:="\s*(\d+)\s*"|>\s*(\d+)\s*<)"#)
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// Error types for destination patching.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A field is missing and there is no `crs:` attribute to insert it next to.
    #[error("No camera raw settings attributes to extend (missing {0})")]
    NoCrsBlock(&'static str),
}

/// Where a missing attribute is spliced in, and the text around it.
struct Insertion {
    at: usize,
    prefix: String,
    suffix: String,
}

/// Find where new attributes go: after the last `crs:` attribute of the
/// first element that carries any. Nested descriptions further down, such
/// as the one inside `crs:Look`, are never extended.
///
/// Attributes laid out one per line get a new line with the same
/// indentation and line ending; attributes sharing a line get a space.
fn insertion_point(content: &str) -> Option<Insertion> {
    let first = CRS_ATTRIBUTE.find(content)?;
    let start = first.start();
    let tag = &content[start..tag_end(content, start)];

    if let Some(caps) = CRS_ATTRIBUTE_LINE.captures_iter(tag).last() {
        let (matched, line_end) = (caps.get(0)?, caps.get(1)?);
        let line_start = content[..start + matched.start()]
            .rfind('\n')
            .map_or(0, |i| i + 1);
        let indent: String = content[line_start..start + matched.start()]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        return Some(Insertion {
            at: start + matched.end(),
            prefix: indent,
            suffix: line_end.as_str().to_string(),
        });
    }

    let last = CRS_ATTRIBUTE.find_iter(tag).last()?;
    Some(Insertion {
        at: start + last.end(),
        prefix: " ".to_string(),
        suffix: String::new(),
    })
}

/// Byte offset of the `>` closing the tag that contains `from`.
fn tag_end(content: &str, from: usize) -> usize {
    let mut quoted = false;
    for (i, byte) in content.bytes().enumerate().skip(from) {
        match byte {
            b'"' => quoted = !quoted,
            b'>' if !quoted => return i,
            _ => {}
        }
    }
    content.len()
}

/// Write a crop box into the text of a destination sidecar.
///
/// Every existing occurrence of a field is replaced in place. A missing
/// field is added to the first element carrying `crs:` attributes, after
/// its last one.
///
/// # Arguments
///
/// * `content` - Destination XMP text
/// * `crop` - Crop box to write
/// * `precision` - Decimal places for floating-point fields
///
/// # Errors
///
/// Returns `PatchError::NoCrsBlock` if a field must be inserted but the
/// file has no `crs:` attributes to extend.
pub fn patch_crop(content: &str, crop: &CrsCrop, precision: usize) -> Result<String, PatchError> {
    let mut content = content.to_string();

    for (name, value) in crop.fields() {
        let local = name.trim_start_matches("crs:");
        let formatted = value.format(precision);

        let mut found = false;
        let replaced = CRS_ATTRIBUTE.replace_all(&content, |caps: &Captures<'_>| {
            if &caps[1] == local {
                found = true;
                format!("{name}=\"{formatted}\"")
            } else {
                caps[0].to_string()
            }
        });
        let replaced = replaced.into_owned();

        if found {
            content = replaced;
            continue;
        }

        let insertion = insertion_point(&content).ok_or(PatchError::NoCrsBlock(name))?;
        debug!(field = name, value = %formatted, "inserting attribute");
        content.insert_str(
            insertion.at,
            &format!(
                "{}{name}=\"{formatted}\"{}",
                insertion.prefix, insertion.suffix
            ),
        );
    }

    Ok(content)
}

/// Read back the crop box stored in a sidecar.
///
/// Returns `None` unless `crs:HasCrop="True"` and all four edges parse.
pub fn read_crop(content: &str) -> Option<CrsCrop> {
    let attributes: HashMap<&str, &str> = CRS_ATTRIBUTE
        .captures_iter(content)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps.get(2)?.as_str();
            Some((name, value))
        })
        .collect();

    let local = |name: &str| name.trim_start_matches("crs:").to_string();
    let number = |name: &str| -> Option<f64> { attributes.get(local(name).as_str())?.parse().ok() };

    if attributes.get(local(HAS_CROP).as_str()) != Some(&"True") {
        return None;
    }

    Some(CrsCrop::new(
        number(CROP_LEFT)?,
        number(CROP_TOP)?,
        number(CROP_RIGHT)?,
        number(CROP_BOTTOM)?,
        number(CROP_ANGLE).unwrap_or(0.0),
    ))
}

/// Read `tiff:Orientation` from a sidecar's text.
pub fn read_orientation(content: &str) -> Option<Orientation> {
    let caps = TIFF_ORIENTATION.captures(content)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    Orientation::parse_flag(value.as_str())
}

//! Streaming extraction of the few values the conversion needs from a
//! source XMP sidecar.
//!
//! Each value may be written either as an attribute on some element
//! (`<rdf:Description nitro:EditModel="...">`) or as an element of its own
//! (`<nitro:EditModel>...</nitro:EditModel>`). Names are matched by their
//! qualified form; nothing else of the RDF structure is interpreted.

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::types::{DecodeError, NitroXmp};
use crate::geometry::Orientation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    EditModel,
    OriginalPixelSize,
    Orientation,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"nitro:EditModel" => Some(Field::EditModel),
            b"nitro:OriginalPixelSize" => Some(Field::OriginalPixelSize),
            b"tiff:Orientation" => Some(Field::Orientation),
            _ => None,
        }
    }
}

/// Parse a source XMP sidecar.
///
/// Missing values are left as `None`; only malformed XML is an error.
///
/// # Errors
///
/// Returns `DecodeError::InvalidXml` if the document or one of the
/// collected values cannot be parsed or unescaped.
pub fn read_nitro_xmp(xml: &str) -> Result<NitroXmp, DecodeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut result = NitroXmp::default();
    // Field being collected from element text, with its raw (escaped) content
    let mut current: Option<(Field, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                collect_attributes(e, &mut result)?;
                if current.is_none() {
                    current = Field::from_name(e.name().as_ref()).map(|f| (f, String::new()));
                }
            }
            Ok(Event::Empty(ref e)) => collect_attributes(e, &mut result)?,
            Ok(Event::Text(ref t)) => {
                if let Some((_, raw)) = current.as_mut() {
                    raw.push_str(&String::from_utf8_lossy(t));
                }
            }
            Ok(Event::GeneralRef(ref r)) => {
                if let Some((_, raw)) = current.as_mut() {
                    raw.push('&');
                    raw.push_str(&String::from_utf8_lossy(r));
                    raw.push(';');
                }
            }
            Ok(Event::CData(ref c)) => {
                if let Some((_, raw)) = current.as_mut() {
                    raw.push_str(&escape(String::from_utf8_lossy(c).as_ref()));
                }
            }
            Ok(Event::End(ref e)) => {
                if let Some((field, raw)) = current.take() {
                    if Field::from_name(e.name().as_ref()) == Some(field) {
                        let value = unescape_value(&raw)?;
                        store(&mut result, field, value);
                    } else {
                        current = Some((field, raw));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DecodeError::InvalidXml(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    debug!(
        has_edit_model = result.edit_model.is_some(),
        original_pixel_size = ?result.original_pixel_size,
        orientation = ?result.orientation,
        "read source XMP"
    );
    Ok(result)
}

fn collect_attributes(element: &BytesStart<'_>, result: &mut NitroXmp) -> Result<(), DecodeError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| DecodeError::InvalidXml(e.to_string()))?;
        if let Some(field) = Field::from_name(attr.key.as_ref()) {
            let raw = std::str::from_utf8(&attr.value)
                .map_err(|e| DecodeError::InvalidXml(e.to_string()))?;
            let value = unescape_value(raw)?;
            store(result, field, value);
        }
    }
    Ok(())
}

/// Unescape a collected value. Some writers escape the embedded property
/// list twice, leaving `&lt;?xml ...` after the first pass.
fn unescape_value(raw: &str) -> Result<String, DecodeError> {
    let once = unescape(raw).map_err(|e| DecodeError::InvalidXml(e.to_string()))?;
    if once.trim_start().starts_with("&lt;") {
        let twice = unescape(&once).map_err(|e| DecodeError::InvalidXml(e.to_string()))?;
        return Ok(twice.into_owned());
    }
    Ok(once.into_owned())
}

/// First occurrence of each field wins.
fn store(result: &mut NitroXmp, field: Field, value: String) {
    match field {
        Field::EditModel => {
            if result.edit_model.is_none() && !value.trim().is_empty() {
                result.edit_model = Some(value);
            }
        }
        Field::OriginalPixelSize => {
            if result.original_pixel_size.is_none() {
                result.original_pixel_size = Some(value.trim().to_string());
            }
        }
        Field::Orientation => {
            if result.orientation.is_none() {
                result.orientation = Orientation::parse_flag(&value);
            }
        }
    }
}

//! Subcommand implementations.

use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::{error, info};

use cropbridge_core::encode::read_crop;
use cropbridge_core::{
    convert_directory, convert_file, read_source, resolve_orientation, Conversion,
    ConvertOptions, CrsCrop,
};

type CommandResult<T> = Result<T, Box<dyn Error>>;

/// Convert one pair of sidecars, or every pair across two directories.
///
/// Returns `false` when any file of a directory run failed; a single-file
/// run returns the conversion error instead.
pub fn convert(
    source: &Path,
    destination: &Path,
    options: &ConvertOptions,
) -> CommandResult<bool> {
    if source.is_file() && destination.is_file() {
        let conversion = convert_file(source, destination, options)?;
        print!("{}", describe_conversion(&conversion, options));
        return Ok(true);
    }

    if source.is_dir() && destination.is_dir() {
        let report = convert_directory(source, destination, options)?;
        for failure in &report.failed {
            error!(source = %failure.source.display(), "{}", failure.error);
        }
        println!("{}", report.summary());
        return Ok(report.failed.is_empty());
    }

    Err(format!(
        "Both paths must be either files or directories\n  Source: {} ({})\n  Destination: {} ({})",
        source.display(),
        path_kind(source),
        destination.display(),
        path_kind(destination)
    )
    .into())
}

/// Describe the crop held by a sidecar.
///
/// Source sidecars show the decoded rectangle and the crop box `convert`
/// would write for it, oriented the same way (`destination` and
/// `probe_image` feed the same orientation fallbacks). Destination sidecars
/// show their current crop settings.
pub fn inspect(
    path: &Path,
    destination: Option<&Path>,
    precision: usize,
    probe_image: bool,
) -> CommandResult<String> {
    let text = fs::read_to_string(path)?;
    let mut out = String::new();

    match read_source(&text) {
        Ok(edit) => {
            let destination_text = destination.map(fs::read_to_string).transpose()?;
            let orientation = resolve_orientation(
                edit.orientation,
                path,
                destination.zip(destination_text.as_deref()),
                probe_image,
            );
            let rect = edit.crop.to_rect(edit.image_size)?;
            let crop = match orientation {
                Some(orientation) => rect.crop_factors().oriented(orientation),
                None => rect.crop_factors(),
            };
            let (width, height) = rect.size();

            writeln!(out, "Nitro sidecar: {}", path.display())?;
            writeln!(out, "  Image size:  {}", edit.image_size)?;
            writeln!(
                out,
                "  Crop rect:   origin ({}, {}), size {} x {}",
                rect.origin().x,
                rect.origin().y,
                width,
                height
            )?;
            writeln!(out, "  Straighten:  {}°", rect.rotation_degrees())?;
            match orientation {
                Some(orientation) => writeln!(out, "  Orientation: {}", orientation as u8)?,
                None => writeln!(out, "  Orientation: not found")?,
            }
            write_fields(&mut out, &crop, precision)?;
        }
        Err(e) => {
            info!(file = %path.display(), reason = %e, "not a Nitro sidecar");
            match read_crop(&text) {
                Some(crop) => {
                    writeln!(out, "Camera raw sidecar: {}", path.display())?;
                    write_fields(&mut out, &crop, precision)?;
                }
                None => writeln!(out, "No crop settings found in {}", path.display())?,
            }
        }
    }

    Ok(out)
}

fn write_fields(out: &mut String, crop: &CrsCrop, precision: usize) -> std::fmt::Result {
    for (name, value) in crop.fields() {
        writeln!(out, "  {name}=\"{}\"", value.format(precision))?;
    }
    Ok(())
}

fn describe_conversion(conversion: &Conversion, options: &ConvertOptions) -> String {
    let verb = if conversion.written {
        "Updated"
    } else {
        "Would update"
    };
    let crop = &conversion.crop;
    let mut out = format!(
        "{verb} {} with crop settings from {}\n  Original size: {}\n",
        conversion.destination.display(),
        conversion.source.display(),
        conversion.image_size
    );
    out.push_str(&format!(
        "  Crop: left={:.4}, top={:.4}, right={:.4}, bottom={:.4}, angle={:.4}\n",
        crop.left, crop.top, crop.right, crop.bottom, crop.angle
    ));
    if options.dry_run {
        out.push_str("  (dry run, file unchanged)\n");
    }
    out
}

fn path_kind(path: &Path) -> &'static str {
    if path.is_file() {
        "file"
    } else if path.is_dir() {
        "directory"
    } else {
        "not found"
    }
}

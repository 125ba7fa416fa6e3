//! Directory conversion: pair sidecars by file name and convert them in
//! parallel.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::convert::{convert_file, Conversion, ConvertError, ConvertOptions};

/// Error types for directory-level operations.
///
/// Per-file failures never surface here; they land in [`BatchReport`].
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A source sidecar and the destination sidecar it updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Result of matching two directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryPairs {
    pub pairs: Vec<FilePair>,
    /// Source sidecars without a destination counterpart.
    pub skipped: Vec<PathBuf>,
}

/// A file that could not be converted.
#[derive(Debug)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub error: ConvertError,
}

/// Tally of a directory conversion.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<Conversion>,
    pub failed: Vec<BatchFailure>,
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    /// Number of source sidecars considered.
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len() + self.skipped.len()
    }

    /// Check if every source sidecar was converted.
    pub fn is_complete(&self) -> bool {
        self.converted.len() == self.total()
    }

    pub fn summary(&self) -> String {
        format!(
            "Conversion complete: {}/{} files updated successfully",
            self.converted.len(),
            self.total()
        )
    }
}

/// Match every `*.xmp` file in `source_dir` (extension compared
/// case-insensitively, sorted by name) with the same file name in
/// `destination_dir`.
///
/// # Errors
///
/// Returns an error if either path is not a directory or the source
/// directory cannot be listed.
pub fn pair_directories(
    source_dir: &Path,
    destination_dir: &Path,
) -> Result<DirectoryPairs, BatchError> {
    for dir in [source_dir, destination_dir] {
        if !dir.is_dir() {
            return Err(BatchError::NotADirectory(dir.to_path_buf()));
        }
    }

    let io_error = |source| BatchError::Io {
        path: source_dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in fs::read_dir(source_dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && is_sidecar(&path) {
            sources.push(path);
        }
    }
    sources.sort();

    let mut result = DirectoryPairs::default();
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        let destination = destination_dir.join(name);
        if destination.is_file() {
            result.pairs.push(FilePair {
                source,
                destination,
            });
        } else {
            warn!(source = %source.display(), "no destination sidecar, skipping");
            result.skipped.push(source);
        }
    }

    debug!(
        pairs = result.pairs.len(),
        skipped = result.skipped.len(),
        "paired sidecar directories"
    );
    Ok(result)
}

/// Convert every paired sidecar between two directories.
///
/// Files are converted in parallel. A failing file is recorded and the
/// rest continue.
pub fn convert_directory(
    source_dir: &Path,
    destination_dir: &Path,
    options: &ConvertOptions,
) -> Result<BatchReport, BatchError> {
    let DirectoryPairs { pairs, skipped } = pair_directories(source_dir, destination_dir)?;
    info!(
        files = pairs.len() + skipped.len(),
        source = %source_dir.display(),
        "converting sidecar directory"
    );

    let results: Vec<(FilePair, Result<Conversion, ConvertError>)> = pairs
        .into_par_iter()
        .map(|pair| {
            let result = convert_file(&pair.source, &pair.destination, options);
            (pair, result)
        })
        .collect();

    let mut report = BatchReport {
        skipped,
        ..Default::default()
    };
    for (pair, result) in results {
        match result {
            Ok(conversion) => report.converted.push(conversion),
            Err(error) => {
                warn!(source = %pair.source.display(), %error, "conversion failed");
                report.failed.push(BatchFailure {
                    source: pair.source,
                    error,
                });
            }
        }
    }

    info!("{}", report.summary());
    Ok(report)
}

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xmp"))
}

//! Output mirroring: where a source's Markdown lands, and the converter seam.
//!
//! `sources/reports/q1.pdf` mirrors to `output/reports/q1.md`. The conversion
//! itself is delegated to a [`Converter`], which reports per-document failures
//! as [`ConversionOutcome::Failed`] and reserves `Err` for faults of the
//! converter itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use docmirror_core::paths::MARKDOWN_EXTENSION;

use crate::error::{invalid_path, SyncError};

#[cfg(test)]
use mockall::automock;

/// Result of converting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success { output: PathBuf },
    Failed { error: String },
}

/// The converter could not do its job at all (as opposed to rejecting a document).
#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("failed to launch converter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns one source document into Markdown at `output`.
///
/// Implementations create `output`'s parent directories themselves.
#[cfg_attr(test, automock)]
pub trait Converter {
    fn convert(&self, source: &Path, output: &Path) -> Result<ConversionOutcome, ConverterError>;
}

/// Outcome of processing one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingResult {
    Success { source: PathBuf, output: PathBuf },
    Failed { source: PathBuf, error: String },
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success { .. })
    }
}

/// Mirrored Markdown path for `source`.
///
/// Fails with [`SyncError::InvalidPath`] when `source` is not under `sources_root`.
pub fn mirror_path(
    source: &Path,
    sources_root: &Path,
    output_root: &Path,
) -> Result<PathBuf, SyncError> {
    let relative = source
        .strip_prefix(sources_root)
        .map_err(|_| invalid_path(source, format!("not under {}", sources_root.display())))?;
    if relative.as_os_str().is_empty() {
        return Err(invalid_path(source, "is the sources root itself"));
    }
    Ok(output_root.join(relative).with_extension(MARKDOWN_EXTENSION))
}

/// Outputs claimed by more than one of `sources`, e.g. `a.pdf` and `a.docx`.
///
/// Sources outside `sources_root` are ignored. Each entry lists its sources in
/// the order given.
pub fn shared_outputs<'p>(
    sources: impl IntoIterator<Item = &'p Path>,
    sources_root: &Path,
    output_root: &Path,
) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut claims: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for source in sources {
        if let Ok(output) = mirror_path(source, sources_root, output_root) {
            claims.entry(output).or_default().push(source.to_path_buf());
        }
    }
    claims.retain(|_, sources| sources.len() > 1);
    claims
}

/// Runs sources through a [`Converter`] into the mirrored output tree.
pub struct OutputMirror<'a> {
    converter: &'a dyn Converter,
}

impl<'a> OutputMirror<'a> {
    pub fn new(converter: &'a dyn Converter) -> Self {
        Self { converter }
    }

    /// Convert `source` into its mirrored location under `output_root`.
    pub fn process_file(
        &self,
        source: &Path,
        sources_root: &Path,
        output_root: &Path,
    ) -> Result<ProcessingResult, SyncError> {
        let output = mirror_path(source, sources_root, output_root)?;
        tracing::debug!("converting {} -> {}", source.display(), output.display());
        let result = match self.converter.convert(source, &output)? {
            ConversionOutcome::Success { output } => ProcessingResult::Success {
                source: source.to_path_buf(),
                output,
            },
            ConversionOutcome::Failed { error } => ProcessingResult::Failed {
                source: source.to_path_buf(),
                error,
            },
        };
        Ok(result)
    }
}

//! Error types for docmirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use docmirror_core::{ConfigError, ManifestError};

use crate::mirror::ConverterError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the manifest store.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// An error loading the project config.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A caller passed a path that violates a component contract.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// A sync run was started on a directory without a manifest.
    #[error("no manifest found at {path}; run `docmirror init` in the project directory first")]
    ManifestMissing { path: PathBuf },

    /// `init` refused to replace an existing manifest.
    #[error("project already initialized (manifest at {path}); pass --force to recreate it")]
    AlreadyInitialized { path: PathBuf },

    /// A file failed to convert under the `fail` error policy.
    #[error(
        "failed to process {source_path}: {message}; nothing was committed \
         (fix the file or rerun with --on-error skip, details in the error log)"
    )]
    ProcessingFailed {
        source_path: PathBuf,
        message: String,
    },

    /// The converter itself faulted (as opposed to rejecting a document).
    #[error(transparent)]
    Converter(#[from] ConverterError),

    /// Index template rendering failed.
    #[error("index render error: {0}")]
    Render(#[from] tera::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::InvalidPath`].
pub(crate) fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> SyncError {
    SyncError::InvalidPath {
        path: path.into(),
        reason: reason.into(),
    }
}

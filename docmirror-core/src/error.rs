//! Error types for docmirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// Remediation shown with every corrupt-manifest error.
pub const CORRUPT_MANIFEST_HINT: &str =
    "restore the file from a backup, or run `docmirror init --force` to recreate an empty manifest \
     (every source will be reprocessed on the next sync)";

/// All errors that can arise from manifest store operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file did not exist at the expected path.
    #[error("manifest not found at {path}")]
    NotFound { path: PathBuf },

    /// The manifest exists but is not valid JSON or fails schema validation.
    #[error("manifest at {path} is corrupt: {reason}; {hint}", hint = CORRUPT_MANIFEST_HINT)]
    Corrupt { path: PathBuf, reason: String },

    /// JSON serialization error (save path).
    #[error("manifest serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// All errors that can arise from project config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse project config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// The project directory could not be resolved to an absolute path.
    #[error("cannot resolve project directory {path}: {source}")]
    ProjectDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn manifest_io(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

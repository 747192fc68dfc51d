//! docmirror core library: manifest model, manifest store, project config.
//!
//! Public API surface:
//! - [`types`]: manifest snapshot and per-file records
//! - [`manifest`]: load / save / create, schema validation
//! - [`config`]: `docmirror.yaml` and the resolved [`ProjectLayout`]
//! - [`paths`]: layout constants and key normalization
//! - [`error`]: [`ManifestError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod types;

pub use config::{ConverterConfig, OnError, ProjectConfig, ProjectLayout};
pub use error::{ConfigError, ManifestError};
pub use manifest::{JsonManifestStore, ManifestStore};
pub use types::{FileRecord, FileStatus, ManifestSnapshot, TOOL_VERSION};

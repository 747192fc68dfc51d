//! Domain types for the docmirror manifest.
//!
//! Manifest keys are source paths relative to the sources root, always in
//! forward-slash form (see [`crate::paths::posix_key`]). Output paths are
//! relative to the output root in the same form.
//! All types are serializable/deserializable via serde + serde_json.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version string written into every manifest this build commits.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Outcome of the last processing attempt for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Success => write!(f, "success"),
            FileStatus::Failed => write!(f, "failed"),
            FileStatus::Skipped => write!(f, "skipped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// What the manifest remembers about one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Lowercase hex SHA-256 of the source bytes at processing time.
    pub sha256: String,
    pub processed_at: DateTime<Utc>,
    /// Output path relative to the output root; empty unless `status` is success.
    pub output: String,
    pub status: FileStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl FileRecord {
    /// Record for a source that converted successfully into `output`.
    pub fn success(sha256: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            sha256: sha256.into(),
            processed_at: Utc::now(),
            output: output.into(),
            status: FileStatus::Success,
            error: None,
        }
    }

    /// Record for a source whose conversion failed with `error`.
    pub fn failure(sha256: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            sha256: sha256.into(),
            processed_at: Utc::now(),
            output: String::new(),
            status: FileStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Root of the persisted manifest (`.docmirror/manifest.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSnapshot {
    #[serde(rename = "docmirror_version")]
    pub tool_version: String,
    pub project_name: String,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
}

impl ManifestSnapshot {
    /// A fresh snapshot with no entries and no sync time.
    pub fn empty(project_name: impl Into<String>) -> Self {
        Self {
            tool_version: TOOL_VERSION.to_string(),
            project_name: project_name.into(),
            last_sync: None,
            files: BTreeMap::new(),
        }
    }

    /// Source key → stored digest, the table change classification runs against.
    pub fn digests(&self) -> HashMap<String, String> {
        self.files
            .iter()
            .map(|(key, record)| (key.clone(), record.sha256.clone()))
            .collect()
    }

    /// Source key → declared output, for records whose status is success.
    pub fn success_outputs(&self) -> BTreeMap<String, String> {
        self.files
            .iter()
            .filter(|(_, record)| record.is_success())
            .map(|(key, record)| (key.clone(), record.output.clone()))
            .collect()
    }

    /// Number of records with the given status.
    pub fn count_status(&self, status: FileStatus) -> usize {
        self.files.values().filter(|r| r.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

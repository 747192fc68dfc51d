//! Manifest store: the single persisted snapshot of a project's sync state.
//!
//! # Storage layout
//!
//! ```text
//! <project>/
//!   .docmirror/
//!     manifest.json       (pretty JSON, replaced atomically on save)
//! ```
//!
//! # API pattern
//!
//! The free functions take the project directory explicitly (`*_at`).
//! [`ManifestStore`] wraps them so the sync engine can be handed a test double.

use std::path::{Path, PathBuf};

use crate::error::{manifest_io, ManifestError};
use crate::paths::{is_absolute_like, manifest_path, state_dir};
use crate::types::{FileStatus, ManifestSnapshot};

/// Persistence seam for [`ManifestSnapshot`].
pub trait ManifestStore {
    fn exists(&self, project_dir: &Path) -> bool;

    /// Write a fresh empty snapshot. Does not check for an existing manifest.
    fn create(
        &self,
        project_dir: &Path,
        project_name: &str,
    ) -> Result<ManifestSnapshot, ManifestError>;

    fn load(&self, project_dir: &Path) -> Result<ManifestSnapshot, ManifestError>;

    fn save(&self, project_dir: &Path, snapshot: &ManifestSnapshot) -> Result<(), ManifestError>;
}

/// Production store: JSON file under `.docmirror/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonManifestStore;

impl ManifestStore for JsonManifestStore {
    fn exists(&self, project_dir: &Path) -> bool {
        exists_at(project_dir)
    }

    fn create(
        &self,
        project_dir: &Path,
        project_name: &str,
    ) -> Result<ManifestSnapshot, ManifestError> {
        create_at(project_dir, project_name)
    }

    fn load(&self, project_dir: &Path) -> Result<ManifestSnapshot, ManifestError> {
        load_at(project_dir)
    }

    fn save(&self, project_dir: &Path, snapshot: &ManifestSnapshot) -> Result<(), ManifestError> {
        save_at(project_dir, snapshot)
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

pub fn exists_at(project_dir: &Path) -> bool {
    manifest_path(project_dir).is_file()
}

/// Create and persist an empty snapshot named `project_name`.
pub fn create_at(project_dir: &Path, project_name: &str) -> Result<ManifestSnapshot, ManifestError> {
    let snapshot = ManifestSnapshot::empty(project_name);
    save_at(project_dir, &snapshot)?;
    Ok(snapshot)
}

/// Load the manifest for `project_dir`.
///
/// Returns `ManifestError::NotFound` if absent, `ManifestError::Corrupt` if the
/// file is not valid JSON or violates the manifest schema.
pub fn load_at(project_dir: &Path) -> Result<ManifestSnapshot, ManifestError> {
    let path = manifest_path(project_dir);
    if !path.exists() {
        return Err(ManifestError::NotFound { path });
    }
    let bytes = std::fs::read(&path).map_err(|e| manifest_io(&path, e))?;
    let contents = String::from_utf8(bytes).map_err(|e| ManifestError::Corrupt {
        path: path.clone(),
        reason: format!("not valid UTF-8 ({e})"),
    })?;
    let snapshot: ManifestSnapshot =
        serde_json::from_str(&contents).map_err(|e| ManifestError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    validate(&snapshot).map_err(|reason| ManifestError::Corrupt { path, reason })?;
    Ok(snapshot)
}

/// Atomically save `snapshot` for `project_dir`.
///
/// Write flow: serialize → `manifest.json.tmp` sibling → `rename`.
pub fn save_at(project_dir: &Path, snapshot: &ManifestSnapshot) -> Result<(), ManifestError> {
    let dir = state_dir(project_dir);
    std::fs::create_dir_all(&dir).map_err(|e| manifest_io(&dir, e))?;

    let path = manifest_path(project_dir);
    let tmp = tmp_path(&path);
    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');
    std::fs::write(&tmp, json).map_err(|e| manifest_io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(manifest_io(&path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

// ---------------------------------------------------------------------------
// Schema validation
// ---------------------------------------------------------------------------

/// Check the invariants serde alone cannot express.
pub fn validate(snapshot: &ManifestSnapshot) -> Result<(), String> {
    for (key, record) in &snapshot.files {
        if key.is_empty() {
            return Err("entry with empty source path".to_string());
        }
        if is_absolute_like(key) || key.contains('\\') {
            return Err(format!(
                "entry '{key}' is not a relative forward-slash path"
            ));
        }
        if !is_sha256_hex(&record.sha256) {
            return Err(format!(
                "entry '{key}' has an invalid sha256 digest '{}'",
                record.sha256
            ));
        }
        match record.status {
            FileStatus::Success => {
                if record.output.is_empty() {
                    return Err(format!("entry '{key}' succeeded but has no output path"));
                }
                if is_absolute_like(&record.output) || record.output.contains('\\') {
                    return Err(format!(
                        "entry '{key}' has non-relative output path '{}'",
                        record.output
                    ));
                }
            }
            FileStatus::Failed | FileStatus::Skipped => {
                if !record.output.is_empty() {
                    return Err(format!(
                        "entry '{key}' is {} but declares output '{}'",
                        record.status, record.output
                    ));
                }
            }
        }
        if record.error.is_some() && record.status != FileStatus::Failed {
            return Err(format!(
                "entry '{key}' carries an error message but is {}",
                record.status
            ));
        }
    }
    Ok(())
}

fn is_sha256_hex(digest: &str) -> bool {
    digest.len() == 64 && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use rstest::rstest;
    use tempfile::TempDir;

    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn write_raw(project: &Path, contents: &str) {
        let path = manifest_path(project);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn load_missing_manifest_returns_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = load_at(tmp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
        assert!(!exists_at(tmp.path()));
    }

    #[test]
    fn create_writes_empty_snapshot() {
        let tmp = TempDir::new().unwrap();
        let created = create_at(tmp.path(), "handbook").unwrap();
        assert!(exists_at(tmp.path()));
        assert_eq!(created.project_name, "handbook");
        assert!(created.last_sync.is_none());
        assert_eq!(load_at(tmp.path()).unwrap(), created);
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        create_at(tmp.path(), "x").unwrap();
        assert!(!tmp_path(&manifest_path(tmp.path())).exists());
    }

    #[test]
    fn invalid_json_is_corrupt_with_hint() {
        let tmp = TempDir::new().unwrap();
        write_raw(tmp.path(), "{ not json");
        let err = load_at(tmp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Corrupt { .. }));
        assert!(err.to_string().contains("docmirror init --force"));
    }

    #[test]
    fn missing_required_field_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        write_raw(tmp.path(), r#"{"project_name":"x","last_sync":null,"files":{}}"#);
        let err = load_at(tmp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Corrupt { .. }));
    }

    #[test]
    fn non_utf8_manifest_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = manifest_path(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            load_at(tmp.path()).unwrap_err(),
            ManifestError::Corrupt { .. }
        ));
    }

    #[rstest]
    #[case::absolute_key("/abs/a.pdf", FileRecord::success(DIGEST, "a.md"))]
    #[case::backslash_key("dir\\a.pdf", FileRecord::success(DIGEST, "dir/a.md"))]
    #[case::short_digest("a.pdf", FileRecord::success("abc", "a.md"))]
    #[case::uppercase_digest("a.pdf", FileRecord::success(DIGEST.to_uppercase(), "a.md"))]
    #[case::success_without_output("a.pdf", FileRecord::success(DIGEST, ""))]
    #[case::absolute_output("a.pdf", FileRecord::success(DIGEST, "/out/a.md"))]
    #[case::failed_with_output("a.pdf", FileRecord { output: "a.md".into(), ..FileRecord::failure(DIGEST, "x") })]
    #[case::error_on_success("a.pdf", FileRecord { error: Some("x".into()), ..FileRecord::success(DIGEST, "a.md") })]
    fn schema_violations_are_rejected(#[case] key: &str, #[case] record: FileRecord) {
        let mut snapshot = ManifestSnapshot::empty("p");
        snapshot.files.insert(key.to_string(), record);
        assert!(validate(&snapshot).is_err());
    }

    #[rstest]
    #[case::success(FileRecord::success(DIGEST, "nested/a.md"))]
    #[case::failed(FileRecord::failure(DIGEST, "converter crashed"))]
    #[case::skipped(FileRecord { status: FileStatus::Skipped, ..FileRecord::success(DIGEST, "") })]
    fn well_formed_records_validate(#[case] record: FileRecord) {
        let mut snapshot = ManifestSnapshot::empty("p");
        snapshot.files.insert("nested/a.pdf".to_string(), record);
        assert_eq!(validate(&snapshot), Ok(()));
    }

    #[test]
    fn store_trait_delegates_to_free_functions() {
        let tmp = TempDir::new().unwrap();
        let store = JsonManifestStore;
        assert!(!store.exists(tmp.path()));
        let mut snapshot = store.create(tmp.path(), "via-trait").unwrap();
        snapshot
            .files
            .insert("a.txt".into(), FileRecord::success(DIGEST, "a.md"));
        store.save(tmp.path(), &snapshot).unwrap();
        assert_eq!(store.load(tmp.path()).unwrap(), snapshot);
    }
}

//! Source discovery and change detection.
//!
//! [`discover`] walks a directory tree and returns candidate files in a
//! stable order. [`discover_changes`] hashes every candidate and partitions
//! the set into new / modified / unchanged against the manifest.

use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use docmirror_core::paths::{posix_key, SUPPORTED_EXTENSIONS};
use docmirror_core::{ManifestError, ManifestStore, ProjectLayout};

use crate::checksum::Checksum;
use crate::classify::{classify, Classification};
use crate::error::{invalid_path, io_err, SyncError};

/// A source file seen by this run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Manifest key (relative to the sources root, forward slashes).
    pub key: String,
    pub digest: String,
    pub classification: Classification,
}

/// Discovery partitioned by classification. Each list keeps discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    pub new_files: Vec<DiscoveredFile>,
    pub modified_files: Vec<DiscoveredFile>,
    pub unchanged_files: Vec<DiscoveredFile>,
}

impl DiscoveryResult {
    /// Files that need processing: new first, then modified.
    pub fn pending(&self) -> impl Iterator<Item = &DiscoveredFile> {
        self.new_files.iter().chain(self.modified_files.iter())
    }

    pub fn pending_len(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }

    pub fn total(&self) -> usize {
        self.pending_len() + self.unchanged_files.len()
    }
}

// ---------------------------------------------------------------------------
// FileDiscovery
// ---------------------------------------------------------------------------

/// Recursively list regular files under `root` whose extension is in
/// `allowed_extensions` (case-insensitive).
///
/// Entries whose name starts with `.` are skipped, and hidden directories
/// are not descended into. Symlinks are followed only when they resolve to a
/// regular file. Subdirectories that cannot be read are skipped. The result
/// is sorted by path string. A missing `root` yields an empty list.
pub fn discover(root: &Path, allowed_extensions: &[&str]) -> Result<Vec<PathBuf>, SyncError> {
    let allowed: BTreeSet<String> = allowed_extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    walk_sorted(root, Some(&allowed))
}

/// Like [`discover`], without the extension filter.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    walk_sorted(root, None)
}

fn walk_sorted(root: &Path, allowed: Option<&BTreeSet<String>>) -> Result<Vec<PathBuf>, SyncError> {
    let mut found = Vec::new();
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => walk(root, allowed, &mut found)?,
        Ok(_) => return Err(invalid_path(root, "discovery root is not a directory")),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(root, err)),
    }
    found.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
    Ok(found)
}

fn walk(
    dir: &Path,
    allowed: Option<&BTreeSet<String>>,
    out: &mut Vec<PathBuf>,
) -> Result<(), SyncError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                tracing::debug!("skipping {}: {err}", path.display());
                continue;
            }
        };

        if file_type.is_dir() {
            // Only the root must be readable; a locked subdirectory is skipped.
            if let Err(err) = walk(&path, allowed, out) {
                tracing::debug!("skipping directory {}: {err}", path.display());
            }
        } else if (file_type.is_file() || (file_type.is_symlink() && resolves_to_file(&path)))
            && allowed.map_or(true, |exts| has_allowed_extension(&path, exts))
        {
            out.push(path);
        }
    }
    Ok(())
}

fn resolves_to_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

fn has_allowed_extension(path: &Path, allowed: &BTreeSet<String>) -> bool {
    path.extension()
        .map(|ext| allowed.contains(&ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// DiscoveryService
// ---------------------------------------------------------------------------

/// Classify every supported file under the sources root.
///
/// A missing manifest is treated as an empty digest table. Files that cannot
/// be hashed (deleted or locked since listing) are left out of all three
/// lists. With `force`, files known to the manifest are `Modified` and unknown
/// files are `New`, regardless of digest.
pub fn discover_changes(
    layout: &ProjectLayout,
    store: &dyn ManifestStore,
    checksum: &dyn Checksum,
    force: bool,
) -> Result<DiscoveryResult, SyncError> {
    let digests: HashMap<String, String> = match store.load(&layout.root) {
        Ok(snapshot) => snapshot.digests(),
        Err(ManifestError::NotFound { .. }) => {
            tracing::debug!("no manifest yet; treating every source as new");
            HashMap::new()
        }
        Err(err) => return Err(err.into()),
    };

    let mut result = DiscoveryResult::default();
    for path in discover(&layout.sources_root, SUPPORTED_EXTENSIONS)? {
        let Ok(relative) = path.strip_prefix(&layout.sources_root) else {
            continue;
        };
        let relative = relative.to_path_buf();

        let digest = match checksum.digest_file(&path) {
            Ok(digest) => digest,
            Err(err) => {
                tracing::debug!("excluding {} from this run: {err}", path.display());
                continue;
            }
        };

        let key = posix_key(&relative);
        let classification = if force {
            if digests.contains_key(&key) {
                Classification::Modified
            } else {
                Classification::New
            }
        } else {
            classify(&relative, &digest, &digests)?
        };

        let file = DiscoveredFile {
            path,
            key,
            digest,
            classification,
        };
        match classification {
            Classification::New => result.new_files.push(file),
            Classification::Modified => result.modified_files.push(file),
            Classification::Unchanged => result.unchanged_files.push(file),
        }
    }

    tracing::debug!(
        "discovered {} new, {} modified, {} unchanged",
        result.new_files.len(),
        result.modified_files.len(),
        result.unchanged_files.len()
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

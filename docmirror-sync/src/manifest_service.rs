//! Accumulate-then-commit manifest updates for a sync run.
//!
//! Outcomes are held in memory while a run processes files and written in a
//! single [`ManifestService::commit`]. A run that stops before commit leaves
//! the manifest exactly as it was.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Utc;

use docmirror_core::paths::{is_absolute_like, posix_key};
use docmirror_core::{
    FileRecord, ManifestError, ManifestSnapshot, ManifestStore, ProjectLayout, TOOL_VERSION,
};

use crate::error::{invalid_path, SyncError};

pub struct ManifestService<'a> {
    layout: &'a ProjectLayout,
    store: &'a dyn ManifestStore,
    pending: BTreeMap<String, FileRecord>,
}

impl<'a> ManifestService<'a> {
    pub fn new(layout: &'a ProjectLayout, store: &'a dyn ManifestStore) -> Self {
        Self {
            layout,
            store,
            pending: BTreeMap::new(),
        }
    }

    /// Queue a success record for `source` producing `output`.
    ///
    /// Both paths may be absolute (under the sources/output roots) or already
    /// relative to them.
    pub fn record_success(
        &mut self,
        source: &Path,
        digest: &str,
        output: &Path,
    ) -> Result<FileRecord, SyncError> {
        let key = relative_key(source, &self.layout.sources_root)?;
        let output = relative_key(output, &self.layout.output_root)?;
        let record = FileRecord::success(digest, output);
        self.pending.insert(key, record.clone());
        Ok(record)
    }

    /// Queue a failure record for `source`.
    pub fn record_failure(
        &mut self,
        source: &Path,
        digest: &str,
        error: &str,
    ) -> Result<FileRecord, SyncError> {
        let key = relative_key(source, &self.layout.sources_root)?;
        let record = FileRecord::failure(digest, error);
        self.pending.insert(key, record.clone());
        Ok(record)
    }

    /// Records queued since the last commit, keyed by source.
    pub fn pending(&self) -> &BTreeMap<String, FileRecord> {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Source keys queued with a non-success record.
    pub fn pending_failures(&self) -> BTreeSet<String> {
        self.pending
            .iter()
            .filter(|(_, record)| !record.is_success())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Merge pending records into the stored manifest and save it once.
    ///
    /// A missing manifest is recreated, named after the project directory.
    /// Pending records win over stored ones with the same key.
    pub fn commit(&mut self) -> Result<ManifestSnapshot, SyncError> {
        let mut snapshot = match self.store.load(&self.layout.root) {
            Ok(snapshot) => snapshot,
            Err(ManifestError::NotFound { .. }) => {
                tracing::warn!(
                    "manifest missing at commit time; recreating it for {}",
                    self.layout.root.display()
                );
                self.store
                    .create(&self.layout.root, &self.layout.project_name())?
            }
            Err(err) => return Err(err.into()),
        };

        let count = self.pending.len();
        snapshot.files.append(&mut self.pending);
        snapshot.last_sync = Some(Utc::now());
        snapshot.tool_version = TOOL_VERSION.to_string();
        self.store.save(&self.layout.root, &snapshot)?;

        tracing::debug!("committed {count} manifest record(s)");
        Ok(snapshot)
    }

    pub fn load_current_snapshot(&self) -> Result<ManifestSnapshot, SyncError> {
        Ok(self.store.load(&self.layout.root)?)
    }
}

/// Manifest key for `path`, relative to `root` when absolute.
pub(crate) fn relative_key(path: &Path, root: &Path) -> Result<String, SyncError> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root)
            .map_err(|_| invalid_path(path, format!("not under {}", root.display())))?
    } else {
        path
    };
    let key = posix_key(relative);
    if key.is_empty() || is_absolute_like(&key) {
        return Err(invalid_path(path, "does not name a file below the root"));
    }
    Ok(key)
}

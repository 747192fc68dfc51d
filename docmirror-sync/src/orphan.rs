//! Orphan detection and cleanup.
//!
//! An orphan is an output the manifest declared as a successful conversion
//! whose source no longer backs it. Either the source file is gone from the
//! sources tree, or its record is being overwritten by a failure this run.
//! Output-tree files the manifest never declared are user-curated; they are
//! counted, never deleted.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use docmirror_core::paths::{posix_key, INDEX_FILE};
use docmirror_core::{ManifestSnapshot, ManifestStore, ProjectLayout};

use crate::discovery::list_files;
use crate::error::{io_err, SyncError};

/// What a cleanup pass found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrphanCleanupOutcome {
    /// Output paths (relative to the output root) detected as orphans.
    pub detected: Vec<String>,
    /// Output paths actually deleted.
    pub removed: Vec<String>,
    /// True when removal was disabled for this run.
    pub skipped: bool,
}

/// Files in `output_files` whose path relative to `output_root` is not in
/// `declared_outputs`. The index file is never an orphan.
pub fn detect(
    output_files: &[PathBuf],
    declared_outputs: &BTreeSet<String>,
    output_root: &Path,
) -> Vec<PathBuf> {
    output_files
        .iter()
        .filter(|path| match path.strip_prefix(output_root) {
            Ok(relative) => {
                let key = posix_key(relative);
                key != INDEX_FILE && !declared_outputs.contains(&key)
            }
            Err(_) => false,
        })
        .cloned()
        .collect()
}

pub struct OrphanService<'a> {
    layout: &'a ProjectLayout,
    store: &'a dyn ManifestStore,
}

impl<'a> OrphanService<'a> {
    pub fn new(layout: &'a ProjectLayout, store: &'a dyn ManifestStore) -> Self {
        Self { layout, store }
    }

    /// Orphaned outputs, relative to the output root, sorted.
    pub fn detect_orphans(&self) -> Result<Vec<String>, SyncError> {
        let snapshot = self.store.load(&self.layout.root)?;
        self.detect_in(&snapshot, &BTreeSet::new())
    }

    /// Detect orphans and, unless `skip_removal`, delete them and prune the
    /// manifest.
    ///
    /// `superseded` holds source keys whose stored success record this run
    /// replaces with a failure; their previous outputs no longer count as
    /// declared. Pruning drops success records whose source and output are
    /// both gone from disk.
    ///
    /// A failed deletion aborts with an error: continuing would leave the
    /// manifest describing files that are not on disk.
    pub fn cleanup(
        &self,
        superseded: &BTreeSet<String>,
        skip_removal: bool,
    ) -> Result<OrphanCleanupOutcome, SyncError> {
        let mut snapshot = self.store.load(&self.layout.root)?;
        let detected = self.detect_in(&snapshot, superseded)?;

        if skip_removal {
            if !detected.is_empty() {
                tracing::info!(
                    "{} orphaned output(s) left in place (removal disabled)",
                    detected.len()
                );
            }
            return Ok(OrphanCleanupOutcome {
                detected,
                removed: Vec::new(),
                skipped: true,
            });
        }

        let mut removed = Vec::new();
        for relative in &detected {
            let path = self.layout.output_root.join(relative);
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            tracing::info!("removed orphan: {}", path.display());
            removed.push(relative.clone());
        }

        let before = snapshot.files.len();
        snapshot.files.retain(|key, record| {
            !(record.is_success()
                && !self.source_exists(key)
                && !self.layout.output_root.join(&record.output).exists())
        });
        let pruned = before - snapshot.files.len();
        if pruned > 0 {
            tracing::debug!("pruned {pruned} manifest record(s) with no source and no output");
            self.store.save(&self.layout.root, &snapshot)?;
        }

        Ok(OrphanCleanupOutcome {
            detected,
            removed,
            skipped: false,
        })
    }

    /// Output-tree files (index excluded) that no manifest record declares.
    pub fn count_user_curated_files(&self) -> Result<usize, SyncError> {
        let snapshot = self.store.load(&self.layout.root)?;
        let declared: BTreeSet<String> = snapshot
            .files
            .values()
            .filter(|record| !record.output.is_empty())
            .map(|record| record.output.clone())
            .collect();
        let files = list_files(&self.layout.output_root)?;
        Ok(detect(&files, &declared, &self.layout.output_root).len())
    }

    fn detect_in(
        &self,
        snapshot: &ManifestSnapshot,
        superseded: &BTreeSet<String>,
    ) -> Result<Vec<String>, SyncError> {
        let tracked = snapshot.success_outputs();

        // Outputs still backed by a success record whose source is on disk.
        let declared: BTreeSet<String> = tracked
            .iter()
            .filter(|(source, _)| !superseded.contains(*source) && self.source_exists(source))
            .map(|(_, output)| output.clone())
            .collect();
        let tracked_outputs: BTreeSet<&str> = tracked.values().map(String::as_str).collect();

        // Only manifest-declared outputs are candidates; user-curated files never are.
        let candidates: Vec<PathBuf> = list_files(&self.layout.output_root)?
            .into_iter()
            .filter(|path| {
                path.strip_prefix(&self.layout.output_root)
                    .map(|rel| tracked_outputs.contains(posix_key(rel).as_str()))
                    .unwrap_or(false)
            })
            .collect();

        let mut orphans: Vec<String> = detect(&candidates, &declared, &self.layout.output_root)
            .iter()
            .filter_map(|path| path.strip_prefix(&self.layout.output_root).ok())
            .map(posix_key)
            .collect();
        orphans.sort();
        Ok(orphans)
    }

    fn source_exists(&self, key: &str) -> bool {
        self.layout.sources_root.join(key).is_file()
    }
}

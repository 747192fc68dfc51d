//! The sync run.
//!
//! ```text
//! Idle -> Discovering -> DryRunReport ------------------------------> Done
//!                     \-> Processing -> CleaningOrphans -> Committing -> Indexing -> Done
//!                              \-> Failed (fail policy)
//! ```
//!
//! Under [`OnError::Fail`] the run stops before orphan cleanup and commit, so
//! an aborted run leaves the manifest exactly as it found it. Under
//! [`OnError::Skip`] every run reaches commit and partial progress is durable.

use std::fmt;

use serde::Serialize;

use docmirror_core::paths::manifest_path;
use docmirror_core::{FileStatus, ManifestStore, OnError, ProjectLayout};

use crate::checksum::Checksum;
use crate::discovery::{discover_changes, DiscoveredFile, DiscoveryResult};
use crate::error::SyncError;
use crate::error_log::ErrorLog;
use crate::index::update_index;
use crate::manifest_service::ManifestService;
use crate::mirror::{shared_outputs, Converter, OutputMirror, ProcessingResult};
use crate::orphan::OrphanService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Reprocess every source regardless of digest.
    pub force: bool,
    /// Report what would happen without touching disk or manifest.
    pub dry_run: bool,
    pub on_error: OnError,
    /// Detect orphans but leave them in place.
    pub skip_removal: bool,
}

/// Collaborators for one run.
pub struct SyncContext<'a> {
    pub layout: &'a ProjectLayout,
    pub store: &'a dyn ManifestStore,
    pub checksum: &'a dyn Checksum,
    pub converter: &'a dyn Converter,
    pub error_log: &'a dyn ErrorLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Discovering,
    DryRunReport,
    Processing,
    CleaningOrphans,
    Committing,
    Indexing,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::Discovering => "discovering",
            SyncState::DryRunReport => "dry-run-report",
            SyncState::Processing => "processing",
            SyncState::CleaningOrphans => "cleaning-orphans",
            SyncState::Committing => "committing",
            SyncState::Indexing => "indexing",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One failed source in a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    /// Manifest key of the source.
    pub source: String,
    pub error: String,
}

/// Result of a run that went through commit and indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub new: usize,
    pub modified: usize,
    /// Sources converted successfully this run.
    pub processed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub failures: Vec<FailureEntry>,
    pub orphans_detected: usize,
    pub orphans_removed: usize,
    pub orphan_removal_skipped: bool,
    pub user_curated: usize,
    /// Files listed in the regenerated index.
    pub indexed: usize,
}

/// What a run would do. Produced without any mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    pub new: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub orphans: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SyncOutcome {
    DryRun(DryRunReport),
    Completed(SyncSummary),
}

struct StateTracker {
    state: SyncState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            state: SyncState::Idle,
        }
    }

    fn enter(&mut self, next: SyncState) {
        tracing::debug!("sync state: {} -> {}", self.state, next);
        self.state = next;
    }
}

fn keys(files: &[DiscoveredFile]) -> Vec<String> {
    files.iter().map(|f| f.key.clone()).collect()
}

/// Run one sync over `ctx.layout`.
pub fn run(ctx: &SyncContext<'_>, options: SyncOptions) -> Result<SyncOutcome, SyncError> {
    let mut tracker = StateTracker::new();

    if !ctx.store.exists(&ctx.layout.root) {
        return Err(SyncError::ManifestMissing {
            path: manifest_path(&ctx.layout.root),
        });
    }

    tracker.enter(SyncState::Discovering);
    let discovery = discover_changes(ctx.layout, ctx.store, ctx.checksum, options.force)?;
    let orphans = OrphanService::new(ctx.layout, ctx.store);

    if options.dry_run {
        tracker.enter(SyncState::DryRunReport);
        let report = DryRunReport {
            new: keys(&discovery.new_files),
            modified: keys(&discovery.modified_files),
            unchanged: keys(&discovery.unchanged_files),
            orphans: orphans.detect_orphans()?,
        };
        tracker.enter(SyncState::Done);
        return Ok(SyncOutcome::DryRun(report));
    }

    tracker.enter(SyncState::Processing);
    let mut manifest = ManifestService::new(ctx.layout, ctx.store);
    let failures = match process_all(ctx, &discovery, options.on_error, &mut manifest) {
        Ok(failures) => failures,
        Err(err) => {
            tracker.enter(SyncState::Failed);
            return Err(err);
        }
    };

    tracker.enter(SyncState::CleaningOrphans);
    let cleanup = orphans.cleanup(&manifest.pending_failures(), options.skip_removal)?;

    tracker.enter(SyncState::Committing);
    manifest.commit()?;

    tracker.enter(SyncState::Indexing);
    let committed = manifest.load_current_snapshot()?;
    tracing::debug!(
        "{} tracked output(s) after commit",
        committed.count_status(FileStatus::Success)
    );
    let index = update_index(&ctx.layout.output_root, &committed.project_name)?;
    let user_curated = orphans.count_user_curated_files()?;

    tracker.enter(SyncState::Done);
    let summary = SyncSummary {
        new: discovery.new_files.len(),
        modified: discovery.modified_files.len(),
        processed: discovery.pending_len() - failures.len(),
        unchanged: discovery.unchanged_files.len(),
        failed: failures.len(),
        failures,
        orphans_detected: cleanup.detected.len(),
        orphans_removed: cleanup.removed.len(),
        orphan_removal_skipped: cleanup.skipped,
        user_curated,
        indexed: index.files.len(),
    };
    tracing::info!(
        "sync complete: {} processed, {} unchanged, {} failed",
        summary.processed,
        summary.unchanged,
        summary.failed
    );
    Ok(SyncOutcome::Completed(summary))
}

/// Convert every pending file, recording outcomes in `manifest`.
///
/// Returns the failures tolerated under the skip policy.
fn process_all(
    ctx: &SyncContext<'_>,
    discovery: &DiscoveryResult,
    on_error: OnError,
    manifest: &mut ManifestService<'_>,
) -> Result<Vec<FailureEntry>, SyncError> {
    let mirror = OutputMirror::new(ctx.converter);
    let mut failures = Vec::new();

    let pending = discovery.pending().map(|file| file.path.as_path());
    let shared = shared_outputs(pending, &ctx.layout.sources_root, &ctx.layout.output_root);
    for (output, sources) in shared {
        tracing::warn!(
            "{} sources map to {}; the last one converted wins: {}",
            sources.len(),
            output.display(),
            sources
                .iter()
                .map(|s| s.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    for file in discovery.pending() {
        let result = mirror.process_file(
            &file.path,
            &ctx.layout.sources_root,
            &ctx.layout.output_root,
        );
        let message = match result {
            Ok(ProcessingResult::Success { output, .. }) => {
                manifest.record_success(&file.path, &file.digest, &output)?;
                continue;
            }
            Ok(ProcessingResult::Failed { error, .. }) => {
                record_failure(ctx, manifest, file, &error)?;
                if on_error == OnError::Fail {
                    return Err(SyncError::ProcessingFailed {
                        source_path: file.path.clone(),
                        message: error,
                    });
                }
                error
            }
            Err(err) => {
                let message = err.to_string();
                record_failure(ctx, manifest, file, &message)?;
                if on_error == OnError::Fail {
                    return Err(err);
                }
                message
            }
        };
        tracing::warn!("skipping {}: {message}", file.key);
        failures.push(FailureEntry {
            source: file.key.clone(),
            error: message,
        });
    }
    Ok(failures)
}

fn record_failure(
    ctx: &SyncContext<'_>,
    manifest: &mut ManifestService<'_>,
    file: &DiscoveredFile,
    message: &str,
) -> Result<(), SyncError> {
    manifest.record_failure(&file.path, &file.digest, message)?;
    ctx.error_log.record(&file.path, message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};

    use docmirror_core::{manifest, paths, JsonManifestStore, ProjectConfig};
    use tempfile::TempDir;

    use crate::checksum::Sha256Checksum;
    use crate::convert::PassthroughConverter;
    use crate::error_log::NullErrorLog;
    use crate::mirror::{ConversionOutcome, ConverterError, MockConverter};

    #[derive(Default)]
    struct RecordingLog {
        lines: RefCell<Vec<(PathBuf, String)>>,
    }

    impl ErrorLog for RecordingLog {
        fn record(&self, source: &Path, message: &str) {
            self.lines
                .borrow_mut()
                .push((source.to_path_buf(), message.to_string()));
        }
    }

    fn project() -> (TempDir, ProjectLayout) {
        let tmp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(tmp.path(), &ProjectConfig::default()).unwrap();
        fs::create_dir_all(&layout.sources_root).unwrap();
        manifest::create_at(&layout.root, "proj").unwrap();
        (tmp, layout)
    }

    fn write_source(layout: &ProjectLayout, rel: &str, content: &str) {
        let path = layout.sources_root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn completed(outcome: SyncOutcome) -> SyncSummary {
        match outcome {
            SyncOutcome::Completed(summary) => summary,
            other => panic!("expected completed run, got {other:?}"),
        }
    }

    /// Fails any source whose name contains "bad", passes the rest through.
    fn picky_converter() -> MockConverter {
        let mut converter = MockConverter::new();
        converter.expect_convert().returning(|source, output| {
            if source.to_string_lossy().contains("bad") {
                Ok(ConversionOutcome::Failed {
                    error: "unreadable".into(),
                })
            } else {
                PassthroughConverter.convert(source, output)
            }
        });
        converter
    }

    #[test]
    fn missing_manifest_is_rejected_before_discovery() {
        let tmp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(tmp.path(), &ProjectConfig::default()).unwrap();
        let mut converter = MockConverter::new();
        converter.expect_convert().times(0);
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &NullErrorLog,
        };
        let err = run(&ctx, SyncOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::ManifestMissing { .. }));
    }

    #[test]
    fn first_run_converts_everything_and_indexes() {
        let (_tmp, layout) = project();
        write_source(&layout, "b.md", "# B");
        write_source(&layout, "a/notes.txt", "hello");
        let converter = PassthroughConverter;
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &NullErrorLog,
        };

        let summary = completed(run(&ctx, SyncOptions::default()).unwrap());
        assert_eq!(summary.new, 2);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.indexed, 2);

        let saved = manifest::load_at(&layout.root).unwrap();
        assert_eq!(saved.files["a/notes.txt"].output, "a/notes.md");
        assert!(saved.last_sync.is_some());
        assert!(layout.output_root.join(paths::INDEX_FILE).is_file());
    }

    #[test]
    fn new_files_are_processed_before_modified_ones() {
        let (_tmp, layout) = project();
        write_source(&layout, "a.md", "v1");
        let converter = PassthroughConverter;
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &NullErrorLog,
        };
        run(&ctx, SyncOptions::default()).unwrap();
        write_source(&layout, "a.md", "v2");
        write_source(&layout, "z.md", "new");

        let mut mock = MockConverter::new();
        mock.expect_convert().returning(|source, _| {
            Ok(ConversionOutcome::Failed {
                error: source.file_name().unwrap().to_string_lossy().into_owned(),
            })
        });
        let log = RecordingLog::default();
        let ctx = SyncContext {
            converter: &mock,
            error_log: &log,
            ..ctx
        };
        let summary = completed(run(&ctx, SyncOptions::default()).unwrap());
        let order: Vec<String> = log.lines.borrow().iter().map(|(_, m)| m.clone()).collect();
        assert_eq!(order, vec!["z.md", "a.md"]);
        assert_eq!(summary.new, 1);
        assert_eq!(summary.modified, 1);
    }

    #[test]
    fn skip_policy_records_failure_and_continues() {
        let (_tmp, layout) = project();
        write_source(&layout, "bad.md", "x");
        write_source(&layout, "good.md", "y");
        let converter = picky_converter();
        let log = RecordingLog::default();
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &log,
        };

        let summary = completed(run(&ctx, SyncOptions::default()).unwrap());
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].source, "bad.md");

        let saved = manifest::load_at(&layout.root).unwrap();
        assert_eq!(saved.files["bad.md"].status, FileStatus::Failed);
        assert_eq!(saved.files["good.md"].status, FileStatus::Success);
        assert_eq!(log.lines.borrow().len(), 1);
    }

    #[test]
    fn fail_policy_aborts_without_committing() {
        let (_tmp, layout) = project();
        write_source(&layout, "a.md", "first");
        write_source(&layout, "bad.md", "x");
        write_source(&layout, "c.md", "never reached");
        let before = fs::read(paths::manifest_path(&layout.root)).unwrap();

        let converter = picky_converter();
        let log = RecordingLog::default();
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &log,
        };
        let options = SyncOptions {
            on_error: OnError::Fail,
            ..SyncOptions::default()
        };

        match run(&ctx, options).unwrap_err() {
            SyncError::ProcessingFailed { source_path, message } => {
                assert_eq!(source_path, layout.sources_root.join("bad.md"));
                assert_eq!(message, "unreadable");
            }
            other => panic!("expected processing failure, got {other:?}"),
        }
        assert_eq!(fs::read(paths::manifest_path(&layout.root)).unwrap(), before);
        assert!(!layout.output_root.join("c.md").exists());
        assert!(!layout.output_root.join(paths::INDEX_FILE).exists());
        assert_eq!(log.lines.borrow().len(), 1);
    }

    #[test]
    fn converter_fault_is_recorded_under_skip_and_reraised_under_fail() {
        let (_tmp, layout) = project();
        write_source(&layout, "a.md", "x");
        let mut converter = MockConverter::new();
        converter.expect_convert().returning(|_, _| {
            Err(ConverterError::Spawn {
                program: "pandoc".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        });
        let log = RecordingLog::default();
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &log,
        };

        let fail = SyncOptions {
            on_error: OnError::Fail,
            ..SyncOptions::default()
        };
        let err = run(&ctx, fail).unwrap_err();
        assert!(matches!(err, SyncError::Converter(ConverterError::Spawn { .. })));
        assert!(manifest::load_at(&layout.root).unwrap().files.is_empty());

        let summary = completed(run(&ctx, SyncOptions::default()).unwrap());
        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].error.contains("pandoc"));
        let saved = manifest::load_at(&layout.root).unwrap();
        assert_eq!(saved.files["a.md"].status, FileStatus::Failed);
        assert_eq!(log.lines.borrow().len(), 2);
    }

    #[test]
    fn dry_run_reports_without_calling_converter() {
        let (_tmp, layout) = project();
        write_source(&layout, "a.md", "x");
        let mut converter = MockConverter::new();
        converter.expect_convert().times(0);
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &NullErrorLog,
        };
        let before = fs::read(paths::manifest_path(&layout.root)).unwrap();

        let outcome = run(
            &ctx,
            SyncOptions {
                dry_run: true,
                ..SyncOptions::default()
            },
        )
        .unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::DryRun(DryRunReport {
                new: vec!["a.md".into()],
                ..DryRunReport::default()
            })
        );
        assert_eq!(fs::read(paths::manifest_path(&layout.root)).unwrap(), before);
        assert!(!layout.output_root.exists());
    }

    #[test]
    fn outcome_serializes_with_mode_tag() {
        let json = serde_json::to_value(SyncOutcome::DryRun(DryRunReport {
            orphans: vec!["old.md".into()],
            ..DryRunReport::default()
        }))
        .unwrap();
        assert_eq!(json["mode"], "dry_run");
        assert_eq!(json["orphans"][0], "old.md");
    }

    #[test]
    fn state_names_are_stable() {
        assert_eq!(SyncState::CleaningOrphans.to_string(), "cleaning-orphans");
        assert_eq!(SyncState::DryRunReport.to_string(), "dry-run-report");
    }
}

//! `docmirror sync`: convert changed sources and refresh the mirror.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docmirror_core::{JsonManifestStore, OnError};
use docmirror_sync::{
    run, DryRunReport, FileErrorLog, RoutingConverter, Sha256Checksum, SyncContext, SyncOptions,
    SyncOutcome, SyncSummary,
};

use super::ProjectDirArg;

/// Arguments for `docmirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub project: ProjectDirArg,

    /// Show what would change without converting, deleting or saving anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Reconvert every source, even unchanged ones.
    #[arg(long)]
    pub force: bool,

    /// What to do when a file fails to convert (default: from docmirror.yaml).
    #[arg(long, value_name = "POLICY")]
    pub on_error: Option<OnError>,

    /// Report orphaned outputs but leave them on disk.
    #[arg(long)]
    pub keep_orphans: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let (layout, config) = self.project.open()?;
        let converter = RoutingConverter::from_config(config.converter.as_ref());
        let error_log = FileErrorLog::for_project(&layout.root);
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &error_log,
        };
        let options = SyncOptions {
            force: self.force,
            dry_run: self.dry_run,
            on_error: self.on_error.unwrap_or(config.on_error),
            skip_removal: self.keep_orphans,
        };
        tracing::debug!(?options, "starting sync in {}", layout.root.display());

        let outcome = run(&ctx, options)
            .with_context(|| format!("sync failed for '{}'", layout.root.display()))?;
        match outcome {
            SyncOutcome::DryRun(report) => print_dry_run(&report),
            SyncOutcome::Completed(summary) => {
                print_summary(&summary, &error_log.path().display().to_string())
            }
        }
        Ok(())
    }
}

fn print_dry_run(report: &DryRunReport) {
    println!(
        "[dry-run] {} new, {} modified, {} unchanged, {} orphaned",
        report.new.len(),
        report.modified.len(),
        report.unchanged.len(),
        report.orphans.len()
    );
    for path in &report.new {
        println!("  {}  {path}", "+".green());
    }
    for path in &report.modified {
        println!("  {}  {path}", "~".yellow());
    }
    for path in &report.orphans {
        println!("  {}  {path}", "-".red());
    }
}

fn print_summary(summary: &SyncSummary, error_log: &str) {
    let mark = if summary.failed == 0 {
        "✓".green()
    } else {
        "!".yellow()
    };
    println!(
        "{mark} Synced: {} converted, {} unchanged, {} failed",
        summary.processed, summary.unchanged, summary.failed
    );

    if summary.orphans_detected > 0 {
        if summary.orphan_removal_skipped {
            println!(
                "  {} orphaned output(s) kept (--keep-orphans)",
                summary.orphans_detected
            );
        } else {
            println!("  {} orphaned output(s) removed", summary.orphans_removed);
        }
    }
    if summary.user_curated > 0 {
        println!("  {} user-curated file(s) left untouched", summary.user_curated);
    }
    println!("  Index: {} file(s)", summary.indexed);

    for failure in &summary.failures {
        println!("  {}  {}: {}", "✗".red(), failure.source, failure.error);
    }
    if summary.failed > 0 {
        println!("Details in {error_log}");
    }
}

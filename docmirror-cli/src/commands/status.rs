//! `docmirror status`: what the next sync would do, and what the manifest holds.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use docmirror_core::{FileStatus, JsonManifestStore};
use docmirror_sync::{
    run, DryRunReport, NullErrorLog, OrphanService, RoutingConverter, Sha256Checksum,
    SyncContext, SyncOptions, SyncOutcome,
};

use super::{format_age, ProjectDirArg};

/// Arguments for `docmirror status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub project: ProjectDirArg,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    project: String,
    last_sync_at: Option<String>,
    last_sync_age: String,
    tracked: ManifestCounts,
    user_curated: usize,
    pending: DryRunReport,
}

#[derive(Debug, Serialize)]
struct ManifestCounts {
    success: usize,
    failed: usize,
    skipped: usize,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "files")]
    files: usize,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let (layout, config) = self.project.open()?;
        let converter = RoutingConverter::from_config(config.converter.as_ref());
        let ctx = SyncContext {
            layout: &layout,
            store: &JsonManifestStore,
            checksum: &Sha256Checksum,
            converter: &converter,
            error_log: &NullErrorLog,
        };
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };

        let pending = match run(&ctx, options).context("failed to compute status")? {
            SyncOutcome::DryRun(report) => report,
            SyncOutcome::Completed(_) => bail!("status run unexpectedly mutated the project"),
        };

        let snapshot = docmirror_core::manifest::load_at(&layout.root)?;
        let user_curated = OrphanService::new(&layout, &JsonManifestStore)
            .count_user_curated_files()?;
        tracing::debug!(user_curated, "status computed for {}", layout.root.display());

        let report = StatusReport {
            project: snapshot.project_name.clone(),
            last_sync_at: snapshot.last_sync.map(|t| t.to_rfc3339()),
            last_sync_age: snapshot
                .last_sync
                .map(format_age)
                .unwrap_or_else(|| "never".to_string()),
            tracked: ManifestCounts {
                success: snapshot.count_status(FileStatus::Success),
                failed: snapshot.count_status(FileStatus::Failed),
                skipped: snapshot.count_status(FileStatus::Skipped),
            },
            user_curated,
            pending,
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

fn print_table(report: &StatusReport) {
    println!(
        "docmirror v{} | {} | last sync: {}",
        env!("CARGO_PKG_VERSION"),
        report.project.bold(),
        report.last_sync_age
    );

    let rows = vec![
        StatusTableRow {
            state: "new".to_string(),
            files: report.pending.new.len(),
        },
        StatusTableRow {
            state: "modified".to_string(),
            files: report.pending.modified.len(),
        },
        StatusTableRow {
            state: "unchanged".to_string(),
            files: report.pending.unchanged.len(),
        },
        StatusTableRow {
            state: "orphaned".to_string(),
            files: report.pending.orphans.len(),
        },
        StatusTableRow {
            state: "tracked ok".to_string(),
            files: report.tracked.success,
        },
        StatusTableRow {
            state: "tracked failed".to_string(),
            files: report.tracked.failed,
        },
        StatusTableRow {
            state: "user-curated".to_string(),
            files: report.user_curated,
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let needs_sync = report.pending.new.len()
        + report.pending.modified.len()
        + report.pending.orphans.len();
    if needs_sync > 0 {
        println!("{}", "Run 'docmirror sync' to bring the mirror up to date.".yellow());
    } else {
        println!("{}", "Mirror is up to date.".green());
    }
}

pub mod index;
pub mod init;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use docmirror_core::{ProjectConfig, ProjectLayout};

/// `--project-dir`, shared by every command that works on an existing project.
#[derive(Args, Debug, Clone)]
pub struct ProjectDirArg {
    /// Project directory (the one holding docmirror.yaml and .docmirror/).
    #[arg(long, short = 'C', value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,
}

impl ProjectDirArg {
    pub fn open(&self) -> Result<(ProjectLayout, ProjectConfig)> {
        ProjectLayout::resolve(&self.project_dir).with_context(|| {
            format!(
                "cannot open project at '{}'",
                self.project_dir.display()
            )
        })
    }
}

/// Human age of `timestamp`: `42s`, `5m`, `3h`, `2d`.
pub fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0);
    match seconds {
        s if s < 60 => format!("{s}s"),
        s if s < 60 * 60 => format!("{}m", s / 60),
        s if s < 60 * 60 * 24 => format!("{}h", s / (60 * 60)),
        s => format!("{}d", s / (60 * 60 * 24)),
    }
}

//! `docmirror index`: rebuild INDEX.md from the current output tree.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docmirror_core::manifest;
use docmirror_sync::update_index;

use super::ProjectDirArg;

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(flatten)]
    pub project: ProjectDirArg,
}

impl IndexArgs {
    pub fn run(self) -> Result<()> {
        let (layout, _) = self.project.open()?;
        let name = if manifest::exists_at(&layout.root) {
            manifest::load_at(&layout.root)?.project_name
        } else {
            layout.project_name()
        };

        let summary = update_index(&layout.output_root, &name)
            .with_context(|| format!("failed to write index for '{name}'"))?;
        tracing::debug!(files = summary.files.len(), "rewrote {}", summary.path.display());
        println!(
            "{} Indexed {} file(s) in {}",
            "✓".green(),
            summary.files.len(),
            summary.path.display()
        );
        Ok(())
    }
}

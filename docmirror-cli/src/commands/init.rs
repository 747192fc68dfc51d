//! `docmirror init [DIR] [--name <name>] [--force]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docmirror_core::{paths, ProjectLayout};
use docmirror_sync::init_project;

/// Initialize a docmirror project.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory; created if missing.
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Project name recorded in the manifest and index (default: directory name).
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Replace an existing manifest with an empty one.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let snapshot = init_project(&self.dir, self.name.as_deref(), self.force)
            .with_context(|| format!("failed to init '{}'", self.dir.display()))?;
        let (layout, _) = ProjectLayout::resolve(&self.dir)?;
        tracing::info!(project = %snapshot.project_name, "initialized {}", layout.root.display());

        println!(
            "{} Initialized '{}' at {}",
            "✓".green(),
            snapshot.project_name,
            layout.root.display()
        );
        println!("  Sources:  {}", layout.sources_root.display());
        println!("  Output:   {}", layout.output_root.display());
        println!("  Config:   {}", paths::config_path(&layout.root).display());
        println!("Drop documents into the sources directory, then run `docmirror sync`.");
        Ok(())
    }
}

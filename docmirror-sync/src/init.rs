//! Project scaffolding for `docmirror init`.

use std::path::Path;

use docmirror_core::config::{self, ProjectLayout};
use docmirror_core::paths::{config_path, manifest_path};
use docmirror_core::{manifest, ManifestSnapshot};

use crate::error::{io_err, SyncError};

/// Create the sources and output directories, a default `docmirror.yaml`
/// (an existing one is kept), and an empty manifest.
///
/// Refuses to replace an existing manifest unless `force` is set.
pub fn init_project(
    project_dir: &Path,
    name: Option<&str>,
    force: bool,
) -> Result<ManifestSnapshot, SyncError> {
    std::fs::create_dir_all(project_dir).map_err(|e| io_err(project_dir, e))?;

    if manifest::exists_at(project_dir) && !force {
        return Err(SyncError::AlreadyInitialized {
            path: manifest_path(project_dir),
        });
    }

    let (layout, project_config) = ProjectLayout::resolve(project_dir)?;
    if !config_path(project_dir).exists() {
        config::save_at(project_dir, &project_config)?;
        tracing::info!("wrote {}", config_path(project_dir).display());
    }

    for dir in [&layout.sources_root, &layout.output_root] {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| layout.project_name());
    let snapshot = manifest::create_at(&layout.root, &name)?;
    tracing::info!("initialized project '{name}' at {}", layout.root.display());
    Ok(snapshot)
}

//! Per-project YAML config (`docmirror.yaml`) and the resolved project layout.
//!
//! The config file is optional: a project without one uses `sources/` and
//! `output/` next to the manifest, skips failing files, and converts only
//! text formats natively.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{config_io, ConfigError};
use crate::paths::{config_path, DEFAULT_OUTPUT_DIR, DEFAULT_SOURCES_DIR};

/// What a sync run does when a single file fails to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Record the failure and continue with the next file.
    #[default]
    Skip,
    /// Record the failure and abort the run before anything is committed.
    Fail,
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnError::Skip => write!(f, "skip"),
            OnError::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for OnError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown error policy '{other}'; expected: skip, fail")),
        }
    }
}

/// External program used for formats that are not converted natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub program: String,
    /// Arguments; `{input}` and `{output}` are substituted per file.
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Sources directory, relative to the project directory.
    #[serde(default = "default_sources_dir")]
    pub sources_dir: PathBuf,
    /// Output directory, relative to the project directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub on_error: OnError,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<ConverterConfig>,
}

fn default_sources_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCES_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            sources_dir: default_sources_dir(),
            output_dir: default_output_dir(),
            on_error: OnError::default(),
            converter: None,
        }
    }
}

/// Load `docmirror.yaml`; an absent file yields the defaults.
pub fn load_at(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = config_path(project_dir);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| config_io(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// Atomically save `config` as `docmirror.yaml`.
pub fn save_at(project_dir: &Path, config: &ProjectConfig) -> Result<(), ConfigError> {
    let path = config_path(project_dir);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| config_io(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| config_io(&path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Absolute locations of everything a sync run touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub sources_root: PathBuf,
    pub output_root: PathBuf,
}

impl ProjectLayout {
    /// Canonicalize `project_dir` and apply `config`'s directory settings.
    pub fn new(project_dir: &Path, config: &ProjectConfig) -> Result<Self, ConfigError> {
        let root = project_dir
            .canonicalize()
            .map_err(|e| ConfigError::ProjectDir {
                path: project_dir.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            sources_root: root.join(&config.sources_dir),
            output_root: root.join(&config.output_dir),
            root,
        })
    }

    /// Load the project config and build the layout from it.
    pub fn resolve(project_dir: &Path) -> Result<(Self, ProjectConfig), ConfigError> {
        let config = load_at(project_dir)?;
        let layout = Self::new(project_dir, &config)?;
        Ok((layout, config))
    }

    /// Project label derived from the directory name.
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "docmirror".to_string())
    }
}

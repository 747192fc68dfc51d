//! Per-file failure log (`.docmirror/errors.log`).
//!
//! The log is a diagnostic sink only: a sync run's outcome never depends on
//! whether a line could be written.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

pub trait ErrorLog {
    fn record(&self, source: &Path, message: &str);
}

/// Appends `<timestamp>\t<source>\t<message>` lines to a file.
#[derive(Debug, Clone)]
pub struct FileErrorLog {
    path: PathBuf,
}

impl FileErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log at the standard location inside `project_dir`.
    pub fn for_project(project_dir: &Path) -> Self {
        Self::new(docmirror_core::paths::error_log_path(project_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl ErrorLog for FileErrorLog {
    fn record(&self, source: &Path, message: &str) {
        let line = format!(
            "{}\t{}\t{}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            source.display(),
            message.replace('\n', " ")
        );
        if let Err(err) = self.append(&line) {
            tracing::warn!(
                "could not write error log {}: {err}",
                self.path.display()
            );
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullErrorLog;

impl ErrorLog for NullErrorLog {
    fn record(&self, _source: &Path, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_one_line_per_failure() {
        let tmp = TempDir::new().unwrap();
        let log = FileErrorLog::for_project(tmp.path());
        log.record(Path::new("/p/sources/a.pdf"), "encrypted");
        log.record(Path::new("/p/sources/b.pdf"), "multi\nline");

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("/p/sources/a.pdf\tencrypted"));
        assert!(lines[1].ends_with("multi line"));
    }

    #[test]
    fn unwritable_log_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        // A directory where the log file should be makes every open fail.
        let path = tmp.path().join("errors.log");
        std::fs::create_dir_all(&path).unwrap();
        FileErrorLog::new(&path).record(Path::new("a.pdf"), "boom");
        assert!(path.is_dir());
    }
}

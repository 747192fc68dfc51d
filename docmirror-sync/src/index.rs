//! `INDEX.md` generation.
//!
//! The index lists every Markdown file in the output tree, tracked or
//! user-curated, so it is rebuilt from a fresh scan rather than from the
//! manifest.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tera::{Context, Tera};

use docmirror_core::paths::{posix_key, INDEX_FILE, MARKDOWN_EXTENSION};

use crate::discovery::discover;
use crate::error::{io_err, SyncError};

const INDEX_TEMPLATE_NAME: &str = "index.md";
const INDEX_TEMPLATE: &str = include_str!("templates/index.md.tera");

/// What was written to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub path: PathBuf,
    /// Listed files, relative to the output root, sorted.
    pub files: Vec<String>,
}

/// Markdown files under `output_root` (index excluded), relative and sorted.
pub fn list_markdown(output_root: &Path) -> Result<Vec<String>, SyncError> {
    let mut files: Vec<String> = discover(output_root, &[MARKDOWN_EXTENSION])?
        .iter()
        .filter_map(|path| path.strip_prefix(output_root).ok())
        .map(posix_key)
        .filter(|key| key != INDEX_FILE)
        .collect();
    files.sort();
    Ok(files)
}

/// Render the index body for `files`. Always ends with exactly one newline.
pub fn render_index(project_name: &str, files: &[String]) -> Result<String, SyncError> {
    let mut tera = Tera::default();
    tera.add_raw_template(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)?;

    let mut ctx = Context::new();
    ctx.insert("project_name", project_name);
    ctx.insert(
        "generated",
        &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    ctx.insert("files", files);

    let rendered = tera.render(INDEX_TEMPLATE_NAME, &ctx)?;
    Ok(format!("{}\n", rendered.trim_end()))
}

/// Rescan `output_root` and rewrite `output_root/INDEX.md`.
pub fn update_index(output_root: &Path, project_name: &str) -> Result<IndexSummary, SyncError> {
    std::fs::create_dir_all(output_root).map_err(|e| io_err(output_root, e))?;

    let files = list_markdown(output_root)?;
    let content = render_index(project_name, &files)?;

    let path = output_root.join(INDEX_FILE);
    let tmp = output_root.join(format!("{INDEX_FILE}.tmp"));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }

    tracing::info!("indexed {} file(s) in {}", files.len(), path.display());
    Ok(IndexSummary { path, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn index_lists_sorted_markdown_and_excludes_itself() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("output");
        touch(&out, "zeta.md");
        touch(&out, "alpha/b.md");
        touch(&out, "alpha/a.MD");
        touch(&out, "notes.txt");
        touch(&out, ".hidden/secret.md");
        touch(&out, INDEX_FILE);

        let summary = update_index(&out, "Research").unwrap();
        assert_eq!(summary.files, vec!["alpha/a.MD", "alpha/b.md", "zeta.md"]);

        let body = fs::read_to_string(out.join(INDEX_FILE)).unwrap();
        assert!(body.starts_with("# Document Index: Research\n"));
        assert!(body.contains("| Files: 3\n"));
        assert!(body.contains("## File Listing\nalpha/a.MD\nalpha/b.md\nzeta.md\n"));
        assert!(!body.contains("secret"));
        assert!(!body.contains("\nINDEX.md"));
        assert!(body.ends_with("zeta.md\n"));
        assert!(!out.join("INDEX.md.tmp").exists());
    }

    #[test]
    fn creates_missing_output_dir_and_renders_empty_listing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("does/not/exist");

        let summary = update_index(&out, "Empty").unwrap();
        assert!(summary.files.is_empty());

        let body = fs::read_to_string(out.join(INDEX_FILE)).unwrap();
        assert!(body.contains("| Files: 0\n"));
        assert!(body.ends_with("## File Listing\n"));
    }

    #[test]
    fn project_name_is_not_html_escaped() {
        let body = render_index("R&D <notes>", &[]).unwrap();
        assert!(body.starts_with("# Document Index: R&D <notes>\n"));
    }

    #[test]
    fn rerun_replaces_previous_index() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().to_path_buf();
        touch(&out, "a.md");
        update_index(&out, "p").unwrap();
        fs::remove_file(out.join("a.md")).unwrap();
        touch(&out, "b.md");

        let summary = update_index(&out, "p").unwrap();
        assert_eq!(summary.files, vec!["b.md"]);
        let body = fs::read_to_string(out.join(INDEX_FILE)).unwrap();
        assert!(!body.contains("a.md"));
    }
}

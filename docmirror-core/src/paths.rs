//! Project layout constants and path helpers.

use std::path::{Component, Path, PathBuf};

pub const STATE_DIR: &str = ".docmirror";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ERROR_LOG_FILE: &str = "errors.log";
pub const CONFIG_FILE: &str = "docmirror.yaml";

pub const DEFAULT_SOURCES_DIR: &str = "sources";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Generated listing at the root of the output tree.
pub const INDEX_FILE: &str = "INDEX.md";
pub const MARKDOWN_EXTENSION: &str = "md";

/// Source extensions the sync engine picks up.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "pptx", "xlsx", "html", "htm", "md", "txt", "csv",
];

pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR)
}

pub fn manifest_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(MANIFEST_FILE)
}

pub fn error_log_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(ERROR_LOG_FILE)
}

pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE)
}

/// Forward-slash form of a relative path, used for every manifest key.
///
/// Accepts either separator so manifests written on Windows stay portable.
/// `.` components are dropped.
pub fn posix_key(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::CurDir => None,
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect();
    parts.join("/").replace('\\', "/")
}

/// True for paths that must never be used as manifest keys: rooted paths,
/// Windows drive prefixes and backslash-rooted strings.
///
/// A drive prefix needs a separator right after `X:`, so a Unix file named
/// `q:notes.txt` stays a valid relative key.
pub fn is_absolute_like(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'/' | b'\\')
    {
        return true;
    }
    let native = Path::new(path);
    native.is_absolute() || native.has_root()
}

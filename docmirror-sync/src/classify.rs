//! Change classification of a source file against the manifest digest table.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use docmirror_core::paths::{is_absolute_like, posix_key};

use crate::error::{invalid_path, SyncError};

/// How a discovered file relates to the last committed manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    New,
    Modified,
    Unchanged,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::New => write!(f, "new"),
            Classification::Modified => write!(f, "modified"),
            Classification::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Classify `relative_path` given its current digest.
///
/// The path is normalized to forward slashes before lookup. Absolute paths
/// are rejected with [`SyncError::InvalidPath`].
pub fn classify(
    relative_path: &Path,
    current_digest: &str,
    manifest_digests: &HashMap<String, String>,
) -> Result<Classification, SyncError> {
    let raw = relative_path.to_string_lossy();
    if relative_path.has_root() || is_absolute_like(&raw) {
        return Err(invalid_path(
            relative_path,
            "expected a path relative to the sources root",
        ));
    }
    let key = posix_key(relative_path);
    Ok(match manifest_digests.get(&key) {
        None => Classification::New,
        Some(stored) if stored != current_digest => Classification::Modified,
        Some(_) => Classification::Unchanged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[rstest]
    #[case::empty_manifest("a.pdf", "d1", &[], Classification::New)]
    #[case::other_keys_only("a.pdf", "d1", &[("b.pdf", "d1")], Classification::New)]
    #[case::same_digest("a.pdf", "d1", &[("a.pdf", "d1")], Classification::Unchanged)]
    #[case::different_digest("a.pdf", "d2", &[("a.pdf", "d1")], Classification::Modified)]
    #[case::nested_unchanged("x/y/a.pdf", "d1", &[("x/y/a.pdf", "d1")], Classification::Unchanged)]
    #[case::backslash_input("x\\a.pdf", "d1", &[("x/a.pdf", "d1")], Classification::Unchanged)]
    fn classification_table(
        #[case] path: &str,
        #[case] digest: &str,
        #[case] entries: &[(&str, &str)],
        #[case] expected: Classification,
    ) {
        let got = classify(Path::new(path), digest, &table(entries)).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn native_and_posix_forms_agree() {
        let digests = table(&[("reports/2024/q1.pdf", "d")]);
        let native = Path::new("reports").join("2024").join("q1.pdf");
        let posix = Path::new("reports/2024/q1.pdf");
        assert_eq!(
            classify(&native, "d", &digests).unwrap(),
            classify(posix, "d", &digests).unwrap()
        );
    }

    #[test]
    fn absolute_path_is_rejected() {
        let err = classify(Path::new("/srv/docs/a.pdf"), "d", &HashMap::new()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPath { .. }));
    }

    #[test]
    fn classification_is_deterministic() {
        let digests = table(&[("a.pdf", "d1")]);
        let first = classify(Path::new("a.pdf"), "d2", &digests).unwrap();
        for _ in 0..10 {
            assert_eq!(classify(Path::new("a.pdf"), "d2", &digests).unwrap(), first);
        }
    }
}

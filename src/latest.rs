//! `latest` symlink resolution.
//!
//! Archive tools keep a `latest` symlink next to the timestamp directories
//! of a branch. The set of directories those links point at decides which
//! documents are flagged `is_latest`. Links can move between runs, so the
//! set is rebuilt on every ingest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const LATEST_LINK: &str = "latest";

/// Canonical targets of every symlink named `latest` under `root`.
///
/// Broken links and links to non-directories are ignored.
pub fn resolve_latest_dirs(root: &Path) -> HashSet<PathBuf> {
    let mut latest = HashSet::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.path_is_symlink() || entry.file_name() != LATEST_LINK {
            continue;
        }
        match std::fs::canonicalize(entry.path()) {
            Ok(target) if target.is_dir() => {
                tracing::debug!(link = %entry.path().display(), target = %target.display(), "latest link");
                latest.insert(target);
            }
            _ => {
                tracing::debug!(link = %entry.path().display(), "ignoring unusable latest link");
            }
        }
    }

    latest
}

//! Archive walker.
//!
//! Discovers candidate markdown files under the archive (or one project of
//! it) and classifies each one. Directory symlinks are not followed, so a
//! branch's `latest` link never causes its target to be indexed twice; a
//! symlinked markdown file is indexed under its own path.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::classify::classify;
use crate::models::Facets;

/// Bookkeeping files written by archive tools.
const SKIP_FILES: &[&str] = &[".scratch-index", ".DS_Store"];

const INCLUDE_GLOBS: &[&str] = &["**/*.md"];
const EXCLUDE_GLOBS: &[&str] = &["**/.git/**"];

/// A markdown file whose path fits the archive layout.
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub facets: Facets,
}

impl ArchiveFile {
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `<root>/<project>/<branch>/<timestamp>`, the directory `latest` links target.
    pub fn timestamp_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.facets.project)
            .join(&self.facets.branch)
            .join(&self.facets.timestamp)
    }
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ArchiveFile>,
    /// Directory entries that could not be read while walking.
    pub errors: u64,
}

/// Walk `scan_root` (the archive root or a project below it) and return
/// every classifiable markdown file, sorted by path.
pub fn scan_archive(root: &Path, scan_root: &Path) -> Result<ScanOutcome> {
    let include_set = build_globset(INCLUDE_GLOBS)?;
    let exclude_set = build_globset(EXCLUDE_GLOBS)?;

    let mut outcome = ScanOutcome::default();

    let walker = WalkDir::new(scan_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("walk error: {}", e);
                outcome.errors += 1;
                continue;
            }
        };
        if !is_regular_file(&entry) {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if SKIP_FILES.iter().any(|skip| *skip == name) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) || !include_set.is_match(relative) {
            continue;
        }

        match classify(path, root) {
            Some(facets) => outcome.files.push(ArchiveFile {
                path: path.to_path_buf(),
                facets,
            }),
            None => tracing::trace!(path = %path.display(), "not an archive document"),
        }
    }

    outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(outcome)
}

/// A regular file, or a symlink resolving to one. Directory links (such as
/// `latest`) and broken links are not files.
fn is_regular_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink()
        && std::fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

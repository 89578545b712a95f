//! Ingestion pipeline orchestration.
//!
//! A run owns one [`Scope`]: the whole archive (full rebuild) or a single
//! project. The schema reset or scope delete and every insert happen on a
//! single transaction, so other projects are never touched and an
//! interrupted run leaves the previous index intact.
//!
//! Unreadable files and duplicate paths are counted and skipped; only a
//! missing archive root or project aborts the run, and both are checked
//! before anything is written.

use anyhow::Result;
use chrono::Local;
use std::path::{Component, Path, PathBuf};

use crate::config::Config;
use crate::connector_fs::{scan_archive, ArchiveFile};
use crate::db;
use crate::error::ArchiveError;
use crate::latest::resolve_latest_dirs;
use crate::migrate;
use crate::models::{Document, Scope};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};
use crate::store;

/// Emit an `Ingesting` event every this many files.
const PROGRESS_EVERY: u64 = 100;

/// Counts reported at the end of an ingest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub scope: Scope,
    pub indexed: u64,
    /// Files skipped because they could not be read or were already indexed.
    pub skipped: u64,
    /// Documents removed from the scope before re-inserting.
    pub removed: u64,
}

/// Run `ingest` and print the summary.
pub async fn run_ingest(
    config: &Config,
    project: Option<&str>,
    progress: &dyn IngestProgressReporter,
) -> Result<()> {
    let summary = ingest_archive(config, project, progress).await?;

    println!(
        "indexed {} documents into {}",
        summary.indexed,
        config.db_path().display()
    );
    if summary.skipped > 0 {
        println!(
            "skipped {} files (read errors or duplicates)",
            summary.skipped
        );
    }
    Ok(())
}

/// Rebuild the index for the whole archive (`project == None`) or one project.
pub async fn ingest_archive(
    config: &Config,
    project: Option<&str>,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestSummary> {
    let root = config.root();
    if !root.is_dir() {
        return Err(ArchiveError::ArchiveRootMissing(root.to_path_buf()).into());
    }
    // Paths are stored as walked; only `latest` membership needs the
    // resolved root, since link targets come back canonical.
    let canonical_root = root.canonicalize()?;

    let (scope, scan_root) = match project {
        Some(name) => (Scope::Project(name.to_string()), project_dir(root, name)?),
        None => (Scope::All, root.to_path_buf()),
    };

    let pool = db::connect(config).await?;
    let mut tx = pool.begin().await?;

    let removed = match &scope {
        Scope::All => {
            let before = existing_count(&mut *tx).await?;
            migrate::reset_schema(&mut *tx).await?;
            before
        }
        Scope::Project(_) => {
            migrate::run_migrations(&mut *tx).await?;
            store::replace_scope(&mut *tx, &scope).await?
        }
    };

    progress.report(IngestProgressEvent::Discovering {
        scope: scope.to_string(),
    });

    let latest_dirs = resolve_latest_dirs(&canonical_root);
    let outcome = scan_archive(root, &scan_root)?;
    let total = outcome.files.len() as u64;
    tracing::info!(%scope, candidates = total, latest = latest_dirs.len(), "scanned archive");

    let indexed_at = Local::now();
    let mut indexed = 0u64;
    let mut skipped = outcome.errors;

    for (i, file) in outcome.files.iter().enumerate() {
        let content = match read_lossy(&file.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %file.path.display(), "unreadable: {}", e);
                skipped += 1;
                continue;
            }
        };

        let is_latest = latest_dirs.contains(&file.timestamp_dir(&canonical_root));
        let doc = to_document(file, is_latest, indexed_at);

        match store::insert(&mut *tx, &doc, &content).await {
            Ok(_) => indexed += 1,
            Err(ArchiveError::DuplicatePath(path)) => {
                tracing::warn!(path = %path.display(), "already indexed in this run");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }

        let n = i as u64 + 1;
        if n % PROGRESS_EVERY == 0 || n == total {
            progress.report(IngestProgressEvent::Ingesting {
                scope: scope.to_string(),
                n,
                total,
            });
        }
    }

    tx.commit().await?;
    pool.close().await;

    tracing::info!(%scope, indexed, skipped, removed, "ingest committed");

    Ok(IngestSummary {
        scope,
        indexed,
        skipped,
        removed,
    })
}

/// `<root>/<name>`, provided `name` is a single path segment naming a directory.
fn project_dir(root: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    let dir = root.join(name);
    if !single || !dir.is_dir() {
        return Err(ArchiveError::ProjectMissing(name.to_string()).into());
    }
    Ok(dir)
}

/// Documents in a previous index; zero when the schema was never created.
async fn existing_count(conn: &mut sqlx::SqliteConnection) -> Result<u64> {
    if migrate::schema_version(conn).await? == 0 {
        return Ok(0);
    }
    Ok(store::count(conn, &Scope::All).await? as u64)
}

fn read_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn to_document(file: &ArchiveFile, is_latest: bool, indexed_at: chrono::DateTime<Local>) -> Document {
    Document {
        facets: file.facets.clone(),
        filepath: file.path.clone(),
        filename: file.filename(),
        is_latest,
        indexed_at,
    }
}

//! Recoverable error conditions.
//!
//! Command entry points return [`anyhow::Result`]; the variants here are the
//! conditions callers need to tell apart (a malformed query versus a missing
//! index, a cancelled picker versus a missing one).

use std::path::PathBuf;

use thiserror::Error;

/// Hint printed alongside a malformed FTS5 query.
pub const QUERY_TIP: &str = "tip: use simple terms or quote phrases with double quotes";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive dir not found: {}", .0.display())]
    ArchiveRootMissing(PathBuf),

    #[error("project not found: {0}")]
    ProjectMissing(String),

    #[error("no database found at {}; run 'ingest' first", .0.display())]
    IndexMissing(PathBuf),

    #[error("duplicate document path: {}", .0.display())]
    DuplicatePath(PathBuf),

    #[error("search error: {message}\n{}", QUERY_TIP)]
    BadQuery { message: String },

    #[error("{0} not found")]
    PickerNotFound(String),

    #[error("failed to run {0}: {1}")]
    PickerFailed(String, #[source] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

//! SQLite database connection management.
//!
//! The index is a single file under the archive root. Connections use WAL
//! journaling with `synchronous = NORMAL`: a crash can lose the last few
//! committed transactions but never corrupts the file, and the whole index
//! can be rebuilt with `ingest` anyway.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::str::FromStr;

use crate::config::Config;
use crate::error::ArchiveError;

/// Open (creating if needed) the index for `config`.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    connect_path(&config.db_path(), true).await
}

/// Open an index that must already exist, failing with
/// [`ArchiveError::IndexMissing`] otherwise.
pub async fn connect_existing(config: &Config) -> Result<SqlitePool> {
    let db_path = config.db_path();
    if !db_path.is_file() {
        return Err(ArchiveError::IndexMissing(db_path).into());
    }
    connect_path(&db_path, false).await
}

async fn connect_path(db_path: &Path, create: bool) -> Result<SqlitePool> {
    if create {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

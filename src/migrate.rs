//! Schema migrations.
//!
//! Each entry of [`MIGRATIONS`] is applied once, in order, and the
//! resulting version is recorded in `PRAGMA user_version`. Running
//! [`run_migrations`] on an up-to-date database is a no-op.
//!
//! `documents_fts` is an FTS5 table whose rowid is the `documents.id` of
//! the row it indexes; the two are always written and deleted together.

use anyhow::Result;
use sqlx::SqliteConnection;

/// Schema steps; index `i` upgrades from version `i` to `i + 1`.
const MIGRATIONS: &[&[&str]] = &[&[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY,
        project TEXT NOT NULL,
        branch TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        category TEXT,
        filepath TEXT NOT NULL UNIQUE,
        filename TEXT NOT NULL,
        is_latest INTEGER NOT NULL DEFAULT 0,
        indexed_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
        content,
        tokenize = 'porter unicode61'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(project)",
    "CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category)",
]];

/// Latest schema version this build knows about.
pub fn target_version() -> i64 {
    MIGRATIONS.len() as i64
}

pub async fn schema_version(conn: &mut SqliteConnection) -> Result<i64> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&mut *conn)
        .await?;
    Ok(version)
}

/// Bring the schema up to [`target_version`].
pub async fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    let current = schema_version(conn).await?;
    if current > target_version() {
        anyhow::bail!(
            "index schema version {} is newer than this build supports ({})",
            current,
            target_version()
        );
    }

    for (version, steps) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        for sql in *steps {
            sqlx::query(sql).execute(&mut *conn).await?;
        }
        set_version(conn, version as i64 + 1).await?;
        tracing::debug!(version = version + 1, "applied migration");
    }

    Ok(())
}

/// Drop every table and recreate the schema from scratch.
///
/// Safe to call inside a transaction; nothing is visible to other
/// connections until it commits.
pub async fn reset_schema(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS documents_fts")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS documents")
        .execute(&mut *conn)
        .await?;
    set_version(conn, 0).await?;
    run_migrations(conn).await
}

async fn set_version(conn: &mut SqliteConnection, version: i64) -> Result<()> {
    // PRAGMA arguments cannot be bound.
    sqlx::query(&format!("PRAGMA user_version = {}", version))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

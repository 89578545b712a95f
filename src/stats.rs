//! Index statistics.
//!
//! `stats` gives a quick picture of what is indexed: totals, per-project
//! and per-category breakdowns, and how many documents sit under a
//! `latest` link.

use anyhow::Result;
use sqlx::{Row, SqliteConnection};

use crate::config::Config;
use crate::db;
use crate::migrate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub total: i64,
    /// (project, count), largest first.
    pub by_project: Vec<(String, i64)>,
    /// (category, count), largest first; unset categories count as `root`.
    pub by_category: Vec<(String, i64)>,
    pub latest: i64,
}

pub async fn collect_stats(conn: &mut SqliteConnection) -> Result<IndexStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&mut *conn)
        .await?;

    let by_project = sqlx::query(
        "SELECT project, COUNT(*) AS cnt FROM documents GROUP BY project ORDER BY cnt DESC, project",
    )
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|row| (row.get::<String, _>("project"), row.get::<i64, _>("cnt")))
    .collect();

    let by_category = sqlx::query(
        r#"
        SELECT COALESCE(category, 'root') AS category, COUNT(*) AS cnt
        FROM documents
        GROUP BY COALESCE(category, 'root')
        ORDER BY cnt DESC, category
        "#,
    )
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|row| (row.get::<String, _>("category"), row.get::<i64, _>("cnt")))
    .collect();

    let latest: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE is_latest = 1")
        .fetch_one(&mut *conn)
        .await?;

    Ok(IndexStats {
        total,
        by_project,
        by_category,
        latest,
    })
}

/// Run the stats command: query the index and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect_existing(config).await?;
    let mut conn = pool.acquire().await?;
    migrate::run_migrations(&mut conn).await?;
    let stats = collect_stats(&mut conn).await?;
    drop(conn);
    pool.close().await;

    let db_size = std::fs::metadata(config.db_path())
        .map(|m| m.len())
        .unwrap_or(0);

    println!("index: {} ({})", config.db_path().display(), format_bytes(db_size));
    println!("total documents: {}", stats.total);

    println!();
    println!("by project:");
    for (project, n) in &stats.by_project {
        println!("  {}: {}", project, n);
    }

    println!();
    println!("by type:");
    for (category, n) in &stats.by_category {
        println!("  {}: {}", category, n);
    }

    println!();
    println!("latest only: {}", stats.latest);

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

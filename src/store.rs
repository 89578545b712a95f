//! Index store: document metadata plus the FTS5 content index.
//!
//! Every function takes a bare [`SqliteConnection`] so the same calls work
//! on a pooled connection or inside a transaction (`&mut *tx`). Ingestion
//! runs [`replace_scope`] and all [`insert`]s on one transaction, so a
//! rebuild is only visible once it commits.

use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::error::ArchiveError;
use crate::models::{Category, Document, Scope, SearchHit};

type Result<T> = std::result::Result<T, ArchiveError>;

/// Conjunctive facet restrictions for [`search`].
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub project: Option<String>,
    pub category: Option<Category>,
    pub branch: Option<String>,
    pub latest_only: bool,
}

/// Delete every document (and its content row) inside `scope`.
///
/// Returns the number of documents removed.
pub async fn replace_scope(conn: &mut SqliteConnection, scope: &Scope) -> Result<u64> {
    let removed = match scope {
        Scope::All => {
            sqlx::query("DELETE FROM documents_fts")
                .execute(&mut *conn)
                .await?;
            sqlx::query("DELETE FROM documents")
                .execute(&mut *conn)
                .await?
                .rows_affected()
        }
        Scope::Project(project) => {
            sqlx::query(
                "DELETE FROM documents_fts WHERE rowid IN (SELECT id FROM documents WHERE project = ?)",
            )
            .bind(project)
            .execute(&mut *conn)
            .await?;
            sqlx::query("DELETE FROM documents WHERE project = ?")
                .bind(project)
                .execute(&mut *conn)
                .await?
                .rows_affected()
        }
    };

    tracing::debug!(%scope, removed, "cleared scope");
    Ok(removed)
}

/// Insert a document and its content, returning the assigned row id.
///
/// Fails with [`ArchiveError::DuplicatePath`] when `filepath` is already
/// indexed; the content row is only written once the metadata row is in.
pub async fn insert(conn: &mut SqliteConnection, doc: &Document, content: &str) -> Result<i64> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO documents
            (project, branch, timestamp, category, filepath, filename, is_latest, indexed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&doc.facets.project)
    .bind(&doc.facets.branch)
    .bind(&doc.facets.timestamp)
    .bind(doc.facets.category.as_str())
    .bind(doc.filepath.to_string_lossy().into_owned())
    .bind(&doc.filename)
    .bind(doc.is_latest)
    .bind(doc.indexed_at.to_rfc3339())
    .execute(&mut *conn)
    .await;

    let id = match inserted {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ArchiveError::DuplicatePath(doc.filepath.clone()));
        }
        Err(e) => return Err(e.into()),
    };

    sqlx::query("INSERT INTO documents_fts (rowid, content) VALUES (?, ?)")
        .bind(id)
        .bind(content)
        .execute(&mut *conn)
        .await?;

    Ok(id)
}

/// Ranked full-text search, best match first.
///
/// `query` is passed to FTS5 as-is, so phrases, `AND`/`OR`/`NOT` and
/// prefix `*` all work. Grammar errors come back as
/// [`ArchiveError::BadQuery`].
pub async fn search(
    conn: &mut SqliteConnection,
    query: &str,
    filters: &SearchFilters,
    limit: i64,
) -> Result<Vec<SearchHit>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT d.filepath, d.project, d.branch, d.timestamp, d.category, d.filename,
               documents_fts.rank AS rank
        FROM documents_fts
        JOIN documents d ON d.id = documents_fts.rowid
        WHERE documents_fts MATCH "#,
    );
    qb.push_bind(query);

    if let Some(project) = &filters.project {
        qb.push(" AND d.project = ").push_bind(project);
    }
    if let Some(category) = filters.category {
        qb.push(" AND d.category = ").push_bind(category.as_str());
    }
    if let Some(branch) = &filters.branch {
        qb.push(" AND d.branch = ").push_bind(branch);
    }
    if filters.latest_only {
        qb.push(" AND d.is_latest = 1");
    }

    qb.push(" ORDER BY rank LIMIT ").push_bind(limit);

    let fetched = qb.build().fetch_all(&mut *conn).await;
    let rows = match fetched {
        Ok(rows) => rows,
        Err(sqlx::Error::Database(e)) => {
            let message = e.message().to_string();
            if is_plain_error(&*e) && match_rejected(conn, query).await {
                return Err(ArchiveError::BadQuery { message });
            }
            return Err(sqlx::Error::Database(e).into());
        }
        Err(e) => return Err(e.into()),
    };

    let hits = rows
        .iter()
        .map(|row| {
            let filepath: String = row.get("filepath");
            SearchHit {
                filepath: filepath.into(),
                project: row.get("project"),
                branch: row.get("branch"),
                timestamp: row.get("timestamp"),
                category: row.get("category"),
                filename: row.get("filename"),
                rank: row.get("rank"),
            }
        })
        .collect();

    Ok(hits)
}

/// `SQLITE_ERROR` proper. Busy, locked, corrupt and I/O failures carry
/// other result codes and are never the query's fault.
fn is_plain_error(e: &dyn sqlx::error::DatabaseError) -> bool {
    e.code().as_deref() == Some("1")
}

/// Whether FTS5 refuses `query` on its own, with no join or filters.
///
/// Only consulted after a failed search, so the extra scan is off the
/// normal path. A missing table is a schema problem, not a query one.
async fn match_rejected(conn: &mut SqliteConnection, query: &str) -> bool {
    let checked: std::result::Result<i64, sqlx::Error> =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents_fts WHERE documents_fts MATCH ?")
            .bind(query)
            .fetch_one(&mut *conn)
            .await;
    match checked {
        Err(sqlx::Error::Database(e)) => !e.message().starts_with("no such table"),
        _ => false,
    }
}

/// Number of documents inside `scope`.
pub async fn count(conn: &mut SqliteConnection, scope: &Scope) -> Result<i64> {
    let n: i64 = match scope {
        Scope::All => {
            sqlx::query_scalar("SELECT COUNT(*) FROM documents")
                .fetch_one(&mut *conn)
                .await?
        }
        Scope::Project(project) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE project = ?")
                .bind(project)
                .fetch_one(&mut *conn)
                .await?
        }
    };
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use crate::models::Facets;
    use chrono::Local;
    use sqlx::Connection;
    use std::path::PathBuf;

    async fn memory() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        migrate::run_migrations(&mut conn).await.unwrap();
        conn
    }

    fn doc(project: &str, category: Category, name: &str, latest: bool) -> Document {
        Document {
            facets: Facets {
                project: project.to_string(),
                branch: "main".to_string(),
                timestamp: "20240101_120000".to_string(),
                category,
            },
            filepath: PathBuf::from(format!(
                "/archive/{}/main/20240101_120000/{}/{}",
                project, category, name
            )),
            filename: name.to_string(),
            is_latest: latest,
            indexed_at: Local::now(),
        }
    }

    fn names(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.filename.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_search() {
        let mut conn = memory().await;
        insert(&mut conn, &doc("proj", Category::Plans, "x.md", false), "jwt rotation bug")
            .await
            .unwrap();

        let hits = search(&mut conn, "rotation", &SearchFilters::default(), 20)
            .await
            .unwrap();
        assert_eq!(names(&hits), vec!["x.md"]);
        assert_eq!(hits[0].category.as_deref(), Some("plans"));
        assert!(hits[0].rank < 0.0);
    }

    #[tokio::test]
    async fn test_duplicate_path_rejected() {
        let mut conn = memory().await;
        let d = doc("proj", Category::Plans, "x.md", false);
        insert(&mut conn, &d, "first").await.unwrap();

        let err = insert(&mut conn, &d, "second").await.unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicatePath(ref p) if *p == d.filepath));
        // No orphan content row was written for the rejected insert.
        let fts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents_fts")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(fts, 1);
    }

    #[tokio::test]
    async fn test_replace_scope_project_only() {
        let mut conn = memory().await;
        insert(&mut conn, &doc("a", Category::Plans, "1.md", false), "alpha").await.unwrap();
        insert(&mut conn, &doc("a", Category::Research, "2.md", false), "alpha").await.unwrap();
        insert(&mut conn, &doc("b", Category::Plans, "3.md", false), "alpha").await.unwrap();

        let removed = replace_scope(&mut conn, &Scope::Project("a".into())).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(count(&mut conn, &Scope::All).await.unwrap(), 1);

        let hits = search(&mut conn, "alpha", &SearchFilters::default(), 20).await.unwrap();
        assert_eq!(names(&hits), vec!["3.md"]);

        // The same path can be inserted again once its scope was cleared.
        insert(&mut conn, &doc("a", Category::Plans, "1.md", false), "alpha").await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_scope_all() {
        let mut conn = memory().await;
        insert(&mut conn, &doc("a", Category::Plans, "1.md", false), "x").await.unwrap();
        insert(&mut conn, &doc("b", Category::Plans, "2.md", false), "x").await.unwrap();
        replace_scope(&mut conn, &Scope::All).await.unwrap();
        assert_eq!(count(&mut conn, &Scope::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let mut conn = memory().await;
        insert(&mut conn, &doc("p", Category::Plans, "pp.md", true), "token").await.unwrap();
        insert(&mut conn, &doc("p", Category::Research, "pr.md", false), "token").await.unwrap();
        insert(&mut conn, &doc("q", Category::Plans, "qp.md", false), "token").await.unwrap();

        let filters = SearchFilters {
            project: Some("p".into()),
            category: Some(Category::Plans),
            ..Default::default()
        };
        let hits = search(&mut conn, "token", &filters, 20).await.unwrap();
        assert_eq!(names(&hits), vec!["pp.md"]);

        let latest = SearchFilters {
            latest_only: true,
            ..Default::default()
        };
        let hits = search(&mut conn, "token", &latest, 20).await.unwrap();
        assert_eq!(names(&hits), vec!["pp.md"]);

        let none = SearchFilters {
            project: Some("q".into()),
            category: Some(Category::Research),
            ..Default::default()
        };
        assert!(search(&mut conn, "token", &none, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_denser_match_ranks_first() {
        let mut conn = memory().await;
        insert(
            &mut conn,
            &doc("p", Category::Plans, "weak.md", false),
            "notes about many unrelated things and one mention of caching somewhere in a long list",
        )
        .await
        .unwrap();
        insert(
            &mut conn,
            &doc("p", Category::Plans, "strong.md", false),
            "caching caching caching",
        )
        .await
        .unwrap();

        let hits = search(&mut conn, "caching", &SearchFilters::default(), 20).await.unwrap();
        assert_eq!(names(&hits), vec!["strong.md", "weak.md"]);
    }

    #[tokio::test]
    async fn test_limit_caps_results() {
        let mut conn = memory().await;
        for i in 0..5 {
            let name = format!("{}.md", i);
            insert(&mut conn, &doc("p", Category::Plans, &name, false), "shared").await.unwrap();
        }
        let hits = search(&mut conn, "shared", &SearchFilters::default(), 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_porter_stemming() {
        let mut conn = memory().await;
        insert(&mut conn, &doc("p", Category::Plans, "s.md", false), "rotating the keys")
            .await
            .unwrap();
        let hits = search(&mut conn, "rotate", &SearchFilters::default(), 20).await.unwrap();
        assert_eq!(names(&hits), vec!["s.md"]);
    }

    #[tokio::test]
    async fn test_unterminated_phrase_is_bad_query() {
        let mut conn = memory().await;
        insert(&mut conn, &doc("p", Category::Plans, "s.md", false), "text").await.unwrap();
        let err = search(&mut conn, "\"jwt rotation", &SearchFilters::default(), 20)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::BadQuery { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_unknown_column_filter_is_bad_query() {
        let mut conn = memory().await;
        let err = search(&mut conn, "title:jwt", &SearchFilters::default(), 20)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::BadQuery { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_missing_schema_is_not_a_query_error() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let err = search(&mut conn, "jwt", &SearchFilters::default(), 20)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Database(_)), "{:?}", err);
        assert!(!err.to_string().contains("tip:"));
    }
}

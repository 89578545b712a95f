//! End-to-end library tests: build an archive tree on disk, ingest it, and
//! query the resulting index.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use scratch_archive::config::Config;
use scratch_archive::error::ArchiveError;
use scratch_archive::ingest::{ingest_archive, IngestSummary};
use scratch_archive::models::{Category, SearchHit};
use scratch_archive::progress::NoProgress;
use scratch_archive::search::{search_archive, SearchRequest};
use scratch_archive::stats::collect_stats;
use scratch_archive::store::SearchFilters;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Archive with two projects, one root-level file, and a few files that
/// must never be indexed.
fn setup_archive() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    write(root, "proj/main/20240101_120000/plans/x.md", "# Plan\n\nFix the jwt rotation bug.\n");
    write(root, "proj/main/20240101_120000/research/y.md", "jwt libraries compared\n");
    write(root, "proj/main/20240101_120000/summary.md", "session summary: caching layer\n");
    write(root, "proj/main/20240102_090000/plans/next.md", "follow up on caching\n");
    write(root, "other/dev/20240103_000000/context/c.md", "unrelated context notes\n");

    // Not indexed: too shallow, bad timestamp, skipped name, not markdown, .git.
    write(root, "proj/main/loose.md", "jwt\n");
    write(root, "proj/main/notatime/plans/z.md", "jwt\n");
    write(root, "proj/main/20240101_120000/.scratch-index", "jwt\n");
    write(root, "proj/main/20240101_120000/plans/notes.txt", "jwt\n");
    write(root, "proj/.git/main/20240101_120000/plans/g.md", "jwt\n");

    let config = Config::for_root(root);
    (tmp, config)
}

async fn ingest(config: &Config, project: Option<&str>) -> IngestSummary {
    ingest_archive(config, project, &NoProgress).await.unwrap()
}

async fn find(config: &Config, query: &str, filters: SearchFilters) -> Vec<SearchHit> {
    let request = SearchRequest {
        query: query.to_string(),
        filters,
        limit: 20,
    };
    search_archive(config, &request).await.unwrap()
}

async fn total(config: &Config) -> i64 {
    let pool = scratch_archive::db::connect_existing(config).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    collect_stats(&mut conn).await.unwrap().total
}

#[tokio::test]
async fn test_full_ingest_indexes_archive_files_only() {
    let (_tmp, config) = setup_archive();
    let summary = ingest(&config, None).await;

    assert_eq!(summary.indexed, 5);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.removed, 0);
    assert!(config.db_path().is_file());

    let hits = find(&config, "jwt", SearchFilters::default()).await;
    let mut names: Vec<&str> = hits.iter().map(|h| h.filename.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["x.md", "y.md"]);
}

#[tokio::test]
async fn test_type_filter_narrows_to_plans() {
    let (_tmp, config) = setup_archive();
    ingest(&config, None).await;

    let filters = SearchFilters {
        category: Some(Category::Plans),
        ..Default::default()
    };
    let hits = find(&config, "jwt", filters).await;
    assert_eq!(hits.len(), 1);

    let hit = &hits[0];
    assert_eq!(hit.filename, "x.md");
    assert_eq!(hit.project, "proj");
    assert_eq!(hit.branch, "main");
    assert_eq!(hit.timestamp, "20240101_120000");
    assert_eq!(hit.category.as_deref(), Some("plans"));
    assert_eq!(
        hit.filepath,
        config.root().join("proj/main/20240101_120000/plans/x.md")
    );
    assert_eq!(hit.display_path(), "proj/main/20240101_120000/plans/x.md");
}

#[tokio::test]
async fn test_jwt_rotation_plans_only() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "proj/main/20240101_120000/plans/x.md", "jwt rotation bug");
    write(tmp.path(), "proj/main/20240101_120000/research/y.md", "jwt rotation design");
    let config = Config::for_root(tmp.path());
    ingest(&config, None).await;

    assert_eq!(find(&config, "jwt rotation", SearchFilters::default()).await.len(), 2);

    let filters = SearchFilters {
        category: Some(Category::Plans),
        ..Default::default()
    };
    let hits = find(&config, "jwt rotation", filters).await;
    let names: Vec<&str> = hits.iter().map(|h| h.filename.as_str()).collect();
    assert_eq!(names, vec!["x.md"]);
}

#[tokio::test]
async fn test_file_directly_under_timestamp_is_root() {
    let (_tmp, config) = setup_archive();
    ingest(&config, None).await;

    let hits = find(&config, "summary", SearchFilters::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].category.as_deref(), Some("root"));

    let filters = SearchFilters {
        category: Some(Category::Root),
        ..Default::default()
    };
    let hits = find(&config, "caching", filters).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "summary.md");
}

#[tokio::test]
async fn test_full_rebuild_is_idempotent() {
    let (_tmp, config) = setup_archive();
    let first = ingest(&config, None).await;
    let second = ingest(&config, None).await;

    assert_eq!(second.indexed, first.indexed);
    assert_eq!(second.skipped, 0);
    assert_eq!(second.removed, first.indexed);
    assert_eq!(total(&config).await, 5);
}

#[tokio::test]
async fn test_full_rebuild_drops_deleted_files() {
    let (_tmp, config) = setup_archive();
    ingest(&config, None).await;

    fs::remove_file(config.root().join("other/dev/20240103_000000/context/c.md")).unwrap();
    ingest(&config, None).await;

    assert_eq!(total(&config).await, 4);
    assert!(find(&config, "unrelated", SearchFilters::default()).await.is_empty());
}

#[tokio::test]
async fn test_project_ingest_leaves_other_projects_untouched() {
    let (_tmp, config) = setup_archive();
    ingest(&config, None).await;

    // New files on disk for both projects; only `proj` is re-ingested.
    write(config.root(), "other/dev/20240104_000000/plans/late.md", "zebra\n");
    write(config.root(), "proj/main/20240102_090000/reviews/r.md", "zebra\n");

    let summary = ingest(&config, Some("proj")).await;
    assert_eq!(summary.indexed, 5);
    assert_eq!(summary.removed, 4);
    assert_eq!(summary.skipped, 0);

    let hits = find(&config, "zebra", SearchFilters::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].project, "proj");

    // The other project's original document is still there.
    let hits = find(&config, "unrelated", SearchFilters::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].project, "other");
    assert_eq!(total(&config).await, 6);
}

#[tokio::test]
async fn test_project_ingest_into_empty_index() {
    let (_tmp, config) = setup_archive();
    let summary = ingest(&config, Some("other")).await;

    assert_eq!(summary.indexed, 1);
    assert_eq!(total(&config).await, 1);

    let filters = SearchFilters {
        project: Some("proj".into()),
        ..Default::default()
    };
    assert!(find(&config, "jwt", filters).await.is_empty());
}

#[tokio::test]
async fn test_missing_project_fails_before_writing() {
    let (_tmp, config) = setup_archive();
    let err = ingest_archive(&config, Some("nope"), &NoProgress)
        .await
        .unwrap_err();

    match err.downcast_ref::<ArchiveError>() {
        Some(ArchiveError::ProjectMissing(name)) => assert_eq!(name, "nope"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!config.db_path().exists());
}

#[tokio::test]
async fn test_missing_root_fails() {
    let tmp = TempDir::new().unwrap();
    let config = Config::for_root(tmp.path().join("absent"));
    let err = ingest_archive(&config, None, &NoProgress).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArchiveError>(),
        Some(ArchiveError::ArchiveRootMissing(_))
    ));
}

#[tokio::test]
async fn test_search_without_index() {
    let (_tmp, config) = setup_archive();
    let request = SearchRequest {
        query: "jwt".into(),
        filters: SearchFilters::default(),
        limit: 20,
    };
    let err = search_archive(&config, &request).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArchiveError>(),
        Some(ArchiveError::IndexMissing(_))
    ));
}

#[tokio::test]
async fn test_empty_index_file_is_not_a_query_error() {
    let (_tmp, config) = setup_archive();
    // An index file left behind before any schema was written.
    let pool = scratch_archive::db::connect(&config).await.unwrap();
    pool.close().await;
    assert!(config.db_path().is_file());

    let request = SearchRequest {
        query: "jwt".into(),
        filters: SearchFilters::default(),
        limit: 20,
    };
    let hits = search_archive(&config, &request).await.unwrap();
    assert!(hits.is_empty());

    scratch_archive::stats::run_stats(&config).await.unwrap();
}

#[tokio::test]
async fn test_bad_query_reports_tip() {
    let (_tmp, config) = setup_archive();
    ingest(&config, None).await;

    let request = SearchRequest {
        query: "\"jwt rotation".into(),
        filters: SearchFilters::default(),
        limit: 20,
    };
    let err = search_archive(&config, &request).await.unwrap_err();
    let archive_err = err.downcast_ref::<ArchiveError>().unwrap();
    assert!(matches!(archive_err, ArchiveError::BadQuery { .. }));
    assert!(err.to_string().starts_with("search error: "));
    assert!(err.to_string().contains("tip:"));
}

#[tokio::test]
async fn test_phrase_and_boolean_queries() {
    let (_tmp, config) = setup_archive();
    ingest(&config, None).await;

    let hits = find(&config, "\"jwt rotation\"", SearchFilters::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "x.md");

    let hits = find(&config, "jwt NOT rotation", SearchFilters::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "y.md");

    let hits = find(&config, "unrel*", SearchFilters::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "c.md");
}

#[cfg(unix)]
#[tokio::test]
async fn test_latest_symlink_marks_documents() {
    let (_tmp, config) = setup_archive();
    std::os::unix::fs::symlink(
        "20240102_090000",
        config.root().join("proj/main/latest"),
    )
    .unwrap();

    let summary = ingest(&config, None).await;
    // Files are reached through the real timestamp dir only.
    assert_eq!(summary.indexed, 5);

    let latest = SearchFilters {
        latest_only: true,
        ..Default::default()
    };
    let hits = find(&config, "caching", latest).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "next.md");

    let all = find(&config, "caching", SearchFilters::default()).await;
    assert_eq!(all.len(), 2);

    let pool = scratch_archive::db::connect_existing(&config).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(collect_stats(&mut conn).await.unwrap().latest, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_root_keeps_walked_paths() {
    let (tmp, real) = setup_archive();
    std::os::unix::fs::symlink(
        "20240102_090000",
        real.root().join("proj/main/latest"),
    )
    .unwrap();

    let holder = TempDir::new().unwrap();
    let link = holder.path().join("scratch_archive");
    std::os::unix::fs::symlink(tmp.path(), &link).unwrap();
    let config = Config::for_root(&link);

    ingest(&config, None).await;

    let hits = find(&config, "rotation", SearchFilters::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0].filepath,
        link.join("proj/main/20240101_120000/plans/x.md")
    );

    // `latest` still resolves through the linked root.
    let latest = SearchFilters {
        latest_only: true,
        ..Default::default()
    };
    let hits = find(&config, "caching", latest).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filepath, link.join("proj/main/20240102_090000/plans/next.md"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let (_tmp, config) = setup_archive();
    let locked = config.root().join("other/dev/20240103_000000/context/locked.md");
    fs::write(&locked, "secret\n").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; the skip only shows for ordinary users.
    let readable = fs::read(&locked).is_ok();
    let summary = ingest(&config, None).await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    if readable {
        assert_eq!(summary.indexed, 6);
        assert_eq!(summary.skipped, 0);
    } else {
        assert_eq!(summary.indexed, 5);
        assert_eq!(summary.skipped, 1);
    }
}

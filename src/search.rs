//! Faceted full-text search.
//!
//! [`search_archive`] runs a [`SearchRequest`] against the index and
//! returns ranked hits; [`run_search`] is the `search` command, which
//! chooses between plain output and the interactive picker.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::db;
use crate::error::ArchiveError;
use crate::migrate;
use crate::models::SearchHit;
use crate::output::{find_match_line, format_hit, print_plain};
use crate::picker::{find_executable, open_file, Candidate, FzfPicker, Picker};
use crate::store::{self, SearchFilters};

#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// FTS5 query text, passed through unmodified.
    pub query: String,
    pub filters: SearchFilters,
    pub limit: i64,
}

/// Presentation flags from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Print snippets under each plain result.
    pub full: bool,
    /// Print the selected path instead of opening it.
    pub file_name: bool,
    /// Never start the picker.
    pub no_picker: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    Plain,
    Interactive,
}

/// Interactive when a human is watching stdout (or a path was explicitly
/// asked for) and the picker is usable; plain otherwise.
pub fn choose_mode(
    stdout_is_tty: bool,
    options: &SearchOptions,
    picker_enabled: bool,
    picker_available: bool,
) -> PresentMode {
    let wants_picker = (stdout_is_tty || options.file_name) && picker_enabled && !options.no_picker;
    if wants_picker && picker_available {
        PresentMode::Interactive
    } else {
        PresentMode::Plain
    }
}

/// Execute `request` against an existing index.
pub async fn search_archive(config: &Config, request: &SearchRequest) -> Result<Vec<SearchHit>> {
    let pool = db::connect_existing(config).await?;
    let mut conn = pool.acquire().await?;
    migrate::run_migrations(&mut conn).await?;

    let hits = store::search(&mut conn, &request.query, &request.filters, request.limit).await;

    drop(conn);
    pool.close().await;

    let hits = hits?;
    tracing::debug!(query = %request.query, hits = hits.len(), "search");
    Ok(hits)
}

pub async fn run_search(config: &Config, request: &SearchRequest, options: SearchOptions) -> Result<()> {
    if request.query.trim().is_empty() {
        println!("no results for: {}", request.query);
        return Ok(());
    }

    let hits = search_archive(config, request).await?;

    if hits.is_empty() {
        println!("no results for: {}", request.query);
        return Ok(());
    }

    let picker_available = find_executable(&config.search.picker).is_some();
    let mode = choose_mode(
        atty::is(atty::Stream::Stdout),
        &options,
        config.search.use_picker,
        picker_available,
    );

    if options.file_name && !options.no_picker && !picker_available {
        tracing::warn!("{} not found; printing plain results", config.search.picker);
    }

    match mode {
        PresentMode::Plain => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            print_plain(&mut out, &hits, &request.query, options.full)?;
        }
        PresentMode::Interactive => {
            let picker = FzfPicker::new(&config.search, &request.query);
            if let Some(path) = pick_hit(&picker, &hits, &request.query)? {
                if options.file_name {
                    println!("{}", path.display());
                } else {
                    open_file(&config.search.opener, &path)?;
                }
            }
        }
    }

    Ok(())
}

/// Run `picker` over `hits`; the chosen file's path, or `None` on cancel.
pub fn pick_hit(
    picker: &dyn Picker,
    hits: &[SearchHit],
    query: &str,
) -> std::result::Result<Option<PathBuf>, ArchiveError> {
    let candidates: Vec<Candidate> = hits
        .iter()
        .map(|hit| {
            let line = find_match_line(&hit.filepath, query);
            Candidate {
                id: hit.filepath.to_string_lossy().into_owned(),
                line,
                display: format_hit(hit, line),
            }
        })
        .collect();

    Ok(picker.pick(&candidates)?.map(PathBuf::from))
}

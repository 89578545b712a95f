//! # scratch-search
//!
//! Command-line front end for the scratch archive index.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scratch-search ingest [-p NAME]` | Rebuild the index (whole archive or one project) |
//! | `scratch-search search PATTERN` | Ranked, faceted full-text search |
//! | `scratch-search stats` | Document counts by project, type and latest |
//!
//! The archive root comes from `SCRATCH_ARCHIVE_BASE`, falling back to
//! `~/scratch_archive`.
//!
//! ```bash
//! scratch-search ingest
//! scratch-search search "jwt rotation" --type plans --latest
//! scratch-search search '"exact phrase" OR token*' --no-fzf --full
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use scratch_archive::models::Category;
use scratch_archive::progress::ProgressMode;
use scratch_archive::search::{SearchOptions, SearchRequest};
use scratch_archive::store::SearchFilters;
use scratch_archive::{config, ingest, search, stats};

/// Full-text search over the scratch archive.
#[derive(Parser)]
#[command(name = "scratch-search", about = "scratch-archive fts5 search", version)]
struct Cli {
    /// Config file (TOML). Defaults to `<archive root>/scratch-search.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from the file tree.
    ///
    /// Without `--project` the whole index is dropped and rebuilt. With it,
    /// only that project's documents are replaced; every other project is
    /// left as it was.
    Ingest {
        /// Ingest only this project.
        #[arg(short, long)]
        project: Option<String>,

        /// Progress on stderr: auto (human when stderr is a TTY), off, human, json.
        #[arg(long, value_enum, default_value = "auto")]
        progress: ProgressMode,
    },

    /// Search with FTS5.
    ///
    /// PATTERN uses FTS5 query syntax: bare terms are ANDed, "double quotes"
    /// make a phrase, and OR / NOT / prefix* are supported.
    Search {
        /// Search pattern.
        pattern: String,

        /// Filter by project.
        #[arg(short, long)]
        project: Option<String>,

        /// Filter by type (plans, context, research, reviews, filebox,
        /// history, prompts, features, root).
        #[arg(short = 't', long = "type")]
        category: Option<Category>,

        /// Filter by branch.
        #[arg(short, long)]
        branch: Option<String>,

        /// Latest archives only.
        #[arg(short, long)]
        latest: bool,

        /// Max results (default: 20).
        #[arg(short = 'n')]
        limit: Option<i64>,

        /// Show matching content snippet.
        #[arg(long)]
        full: bool,

        /// Output the selected filepath instead of opening it.
        #[arg(long)]
        file_name: bool,

        /// Skip fzf, plain output.
        #[arg(long)]
        no_fzf: bool,
    },

    /// Show indexed document counts.
    Stats,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("SCRATCH_SEARCH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { project, progress } => {
            ingest::run_ingest(&cfg, project.as_deref(), progress.reporter().as_ref()).await?;
        }
        Commands::Search {
            pattern,
            project,
            category,
            branch,
            latest,
            limit,
            full,
            file_name,
            no_fzf,
        } => {
            let limit = limit.unwrap_or(cfg.search.default_limit);
            if limit < 1 {
                anyhow::bail!("-n must be >= 1");
            }
            let request = SearchRequest {
                query: pattern,
                filters: SearchFilters {
                    project,
                    category,
                    branch,
                    latest_only: latest,
                },
                limit,
            };
            let options = SearchOptions {
                full,
                file_name,
                no_picker: no_fzf,
            };
            search::run_search(&cfg, &request, options).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

//! # scratch-archive
//!
//! Faceted full-text search over a scratch archive: a tree of markdown
//! work notes laid out as
//!
//! ```text
//! <root>/<project>/<branch>/<YYYYMMDD_HHMMSS>/[<category>/]<file>.md
//! ```
//!
//! with a `latest` symlink per branch pointing at the newest timestamp.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   ┌───────────┐   ┌──────────────┐
//! │ connector_fs   │──▶│  ingest   │──▶│   SQLite     │
//! │ classify+latest│   │ (1 tx)    │   │ docs + FTS5  │
//! └────────────────┘   └───────────┘   └──────┬───────┘
//!                                             ▼
//!                                      ┌──────────────┐
//!                                      │   search     │
//!                                      │ plain | fzf  │
//!                                      └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Archive root and search settings |
//! | [`classify`] | Path → facets |
//! | [`latest`] | `latest` symlink resolution |
//! | [`connector_fs`] | Archive walker |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`store`] | Insert, scoped delete, ranked search |
//! | [`ingest`] | Full and per-project rebuilds |
//! | [`search`] | `search` command |
//! | [`output`] | Plain results, line location, snippets |
//! | [`picker`] | Interactive selection |
//! | [`stats`] | Index statistics |

pub mod classify;
pub mod config;
pub mod connector_fs;
pub mod db;
pub mod error;
pub mod ingest;
pub mod latest;
pub mod migrate;
pub mod models;
pub mod output;
pub mod picker;
pub mod progress;
pub mod search;
pub mod stats;
pub mod store;

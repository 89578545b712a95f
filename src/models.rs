//! Core data models used throughout the archive index.
//!
//! These types describe the facets derived from an archive path, the
//! documents stored in SQLite, and the hits returned from a search.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Local};

/// Folder directly beneath a timestamp directory.
///
/// Files not living under one of the named folders are classified as
/// [`Category::Root`] so they still participate in `--type` filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Plans,
    Context,
    Research,
    Reviews,
    Filebox,
    History,
    Prompts,
    Features,
    Root,
}

impl Category {
    /// Named category folders, in the order they are listed to users.
    pub const NAMED: [Category; 8] = [
        Category::Plans,
        Category::Context,
        Category::Research,
        Category::Reviews,
        Category::Filebox,
        Category::History,
        Category::Prompts,
        Category::Features,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Plans => "plans",
            Category::Context => "context",
            Category::Research => "research",
            Category::Reviews => "reviews",
            Category::Filebox => "filebox",
            Category::History => "history",
            Category::Prompts => "prompts",
            Category::Features => "features",
            Category::Root => "root",
        }
    }

    /// Look up a named category folder. `root` is not a folder name.
    pub fn from_folder(name: &str) -> Option<Category> {
        Self::NAMED.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "root" {
            return Ok(Category::Root);
        }
        Category::from_folder(s).ok_or_else(|| {
            let names: Vec<&str> = Category::NAMED.iter().map(|c| c.as_str()).collect();
            format!("unknown type '{}'. Use one of: {}, root", s, names.join(", "))
        })
    }
}

/// Facets parsed from `<project>/<branch>/<timestamp>/[<category>/]<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facets {
    pub project: String,
    pub branch: String,
    pub timestamp: String,
    pub category: Category,
}

/// Normalized document stored in SQLite.
#[derive(Debug, Clone)]
pub struct Document {
    pub facets: Facets,
    pub filepath: PathBuf,
    pub filename: String,
    pub is_latest: bool,
    pub indexed_at: DateTime<Local>,
}

/// Which documents an ingestion run owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Project(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Project(name) => write!(f, "project:{}", name),
        }
    }
}

/// A ranked search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub filepath: PathBuf,
    pub project: String,
    pub branch: String,
    pub timestamp: String,
    /// Stored category; `None` only for rows written without one.
    pub category: Option<String>,
    pub filename: String,
    /// Raw FTS5 bm25 rank (lower is better, usually negative).
    pub rank: f64,
}

impl SearchHit {
    /// `project/branch/timestamp/category/filename`, as shown in results.
    pub fn display_path(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.project,
            self.branch,
            self.timestamp,
            self.category.as_deref().unwrap_or(""),
            self.filename
        )
    }

    /// Absolute rank formatted for display.
    pub fn score_label(&self) -> String {
        format!("[{:.2}]", self.rank.abs())
    }
}

//! Configuration.
//!
//! The archive root is resolved once at startup: `SCRATCH_ARCHIVE_BASE`
//! if set, otherwise `[archive].root` from the config file, otherwise
//! `~/scratch_archive`. The config file itself is optional and lives at
//! `<root>/scratch-search.toml` unless `--config` names another one.
//!
//! ```toml
//! [archive]
//! root = "/Users/me/scratch_archive"
//!
//! [search]
//! default_limit = 20
//! picker = "fzf"
//! use_picker = true
//! preview_context = 15
//! preview_window = "right:60%:wrap"
//! opener = "open"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the archive root.
pub const ARCHIVE_ENV: &str = "SCRATCH_ARCHIVE_BASE";

/// Index file name, relative to the archive root.
pub const DB_FILE: &str = "archives.db";

/// Config file name looked up in the archive root.
pub const CONFIG_FILE: &str = "scratch-search.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scratch_archive")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_picker")]
    pub picker: String,
    #[serde(default = "default_use_picker")]
    pub use_picker: bool,
    #[serde(default = "default_preview_context")]
    pub preview_context: usize,
    #[serde(default = "default_preview_window")]
    pub preview_window: String,
    #[serde(default = "default_opener")]
    pub opener: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            picker: default_picker(),
            use_picker: default_use_picker(),
            preview_context: default_preview_context(),
            preview_window: default_preview_window(),
            opener: default_opener(),
        }
    }
}

fn default_limit() -> i64 {
    20
}
fn default_picker() -> String {
    "fzf".to_string()
}
fn default_use_picker() -> bool {
    true
}
fn default_preview_context() -> usize {
    15
}
fn default_preview_window() -> String {
    "right:60%:wrap".to_string()
}
fn default_opener() -> String {
    if cfg!(target_os = "macos") {
        "open".to_string()
    } else {
        "xdg-open".to_string()
    }
}

impl Config {
    /// Defaults rooted at `root`, no config file involved.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            archive: ArchiveConfig { root: root.into() },
            search: SearchConfig::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.archive.root
    }

    /// The single-file index under the archive root.
    pub fn db_path(&self) -> PathBuf {
        self.archive.root.join(DB_FILE)
    }
}

/// Resolve configuration for this process.
///
/// `explicit` is the `--config` flag; a named file must exist. Without it
/// the archive root's `scratch-search.toml` is read when present.
pub fn resolve(explicit: Option<&Path>) -> Result<Config> {
    let env_root = std::env::var_os(ARCHIVE_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let root = env_root.clone().unwrap_or_else(default_root);
            let candidate = root.join(CONFIG_FILE);
            if candidate.is_file() {
                load_config(&candidate)?
            } else {
                Config::for_root(root)
            }
        }
    };

    if let Some(root) = env_root {
        config.archive.root = root;
    }

    tracing::debug!(root = %config.archive.root.display(), "archive root");
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.search.default_limit < 1 {
        anyhow::bail!("search.default_limit must be >= 1");
    }

    if config.search.preview_context == 0 {
        anyhow::bail!("search.preview_context must be >= 1");
    }

    if config.search.picker.trim().is_empty() {
        anyhow::bail!("search.picker must not be empty");
    }

    Ok(config)
}

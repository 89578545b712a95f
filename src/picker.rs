//! Interactive selection.
//!
//! The search command only needs "show these candidates, tell me which one
//! was chosen". [`Picker`] is that contract; [`FzfPicker`] implements it by
//! driving `fzf` as a child process with a `bat`/`rg` preview centered on
//! each candidate's matching line.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::SearchConfig;
use crate::error::ArchiveError;
use crate::output::line_terms;

/// One selectable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Returned from [`Picker::pick`] when chosen; the file path.
    pub id: String,
    /// Line the preview is centered on.
    pub line: usize,
    pub display: String,
}

pub trait Picker {
    /// Present `candidates` in order. `Ok(None)` means the user cancelled
    /// or picked nothing.
    fn pick(&self, candidates: &[Candidate]) -> std::result::Result<Option<String>, ArchiveError>;
}

pub struct FzfPicker {
    binary: String,
    query: String,
    preview_context: usize,
    preview_window: String,
}

impl FzfPicker {
    pub fn new(config: &SearchConfig, query: &str) -> Self {
        Self {
            binary: config.picker.clone(),
            query: query.to_string(),
            preview_context: config.preview_context,
            preview_window: config.preview_window.clone(),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--ansi".into(),
            "--delimiter".into(),
            "\t".into(),
            "--with-nth".into(),
            "3".into(),
            "--preview".into(),
            preview_command(&self.query, self.preview_context),
            "--preview-window".into(),
            self.preview_window.clone(),
            "--header".into(),
            format!("search: {} | enter: select | esc: cancel", self.query),
            "--bind".into(),
            "ctrl-u:preview-half-page-up,ctrl-d:preview-half-page-down".into(),
        ]
    }
}

impl Picker for FzfPicker {
    fn pick(&self, candidates: &[Candidate]) -> std::result::Result<Option<String>, ArchiveError> {
        let spawned = Command::new(&self.binary)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArchiveError::PickerNotFound(self.binary.clone()));
            }
            Err(e) => return Err(ArchiveError::PickerFailed(self.binary.clone(), e)),
        };

        if let Some(mut stdin) = child.stdin.take() {
            let input = candidate_lines(candidates);
            // The picker may exit before reading everything; that is a cancel.
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                tracing::debug!("picker closed stdin early: {}", e);
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ArchiveError::PickerFailed(self.binary.clone(), e))?;

        if !output.status.success() {
            tracing::debug!(status = ?output.status.code(), "picker cancelled");
            return Ok(None);
        }

        Ok(parse_selection(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// `id \t line \t display`, one candidate per line.
pub fn candidate_lines(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{}\t{}\t{}", c.id, c.line, c.display))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Id of the selected line, if any.
pub fn parse_selection(stdout: &str) -> Option<String> {
    let selected = stdout.trim();
    if selected.is_empty() {
        return None;
    }
    selected
        .lines()
        .next()
        .and_then(|l| l.split('\t').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Shell snippet fzf runs for each highlighted line (`{}` is the line).
///
/// Shows `context` lines either side of the match with `bat`, highlights
/// the query terms with `rg`, and degrades to plain `sed` output.
pub fn preview_command(query: &str, context: usize) -> String {
    let patterns: String = line_terms(query)
        .iter()
        .map(|t| format!(" -e {}", shell_quote(t)))
        .collect();
    let highlight = if patterns.is_empty() {
        "cat".to_string()
    } else {
        format!(
            "rg --color=always --colors 'match:bg:yellow' --colors 'match:fg:black' \
             --colors 'match:style:bold' --passthru -i -F{}",
            patterns
        )
    };

    format!(
        "file=$(echo {{}} | cut -f1); \
         line=$(echo {{}} | cut -f2); \
         start=$((line > {ctx} ? line - {ctx} : 1)); \
         end=$((line + {ctx})); \
         bat --color=always --style=numbers --highlight-line \"$line\" \
         --line-range \"$start:$end\" \"$file\" 2>/dev/null | {highlight} || \
         sed -n \"${{start}},${{end}}p\" \"$file\"",
        ctx = context,
        highlight = highlight,
    )
}

/// Single-quote `s` for POSIX sh.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Locate `binary` the way the shell would: a path is checked directly,
/// a bare name is searched on `PATH`.
pub fn find_executable(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        let full = dir.join(binary);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = full.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Open `path` with the configured opener (`open`, `xdg-open`, ...).
pub fn open_file(opener: &str, path: &Path) -> Result<()> {
    let status = Command::new(opener)
        .arg(path)
        .status()
        .with_context(|| format!("failed to run {}", opener))?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", opener, status);
    }
    Ok(())
}

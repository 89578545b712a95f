//! Plain result output and the file re-scans behind it.
//!
//! Ranking happens in FTS5 with porter stemming. Locating the line to show
//! is a separate, much simpler pass over the file: the first line that
//! contains any whitespace-separated query term as a case-insensitive
//! substring. The two deliberately disagree on edge cases (stems, phrase
//! operators) and must not be merged.

use regex::RegexBuilder;
use std::io::{self, Write};
use std::path::Path;

use crate::models::SearchHit;

/// Lines of snippet printed per hit with `--full`.
const SNIPPET_LINES: usize = 4;
const SNIPPET_INDENT: &str = "        ";

/// Query terms for line location: double quotes dropped, split on whitespace.
pub fn line_terms(query: &str) -> Vec<String> {
    query
        .replace('"', "")
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// 1-based number of the first line containing any query term.
///
/// Falls back to line 1 when nothing matches or the file is unreadable.
pub fn find_match_line(path: &Path, query: &str) -> usize {
    let terms = line_terms(query);
    let Ok(text) = read_lossy(path) else {
        return 1;
    };
    text.lines()
        .position(|line| {
            let lower = line.to_lowercase();
            terms.iter().any(|t| lower.contains(t.as_str()))
        })
        .map(|i| i + 1)
        .unwrap_or(1)
}

/// Lines around the first case-insensitive literal match of `query`:
/// one line before, the match, and two after.
pub fn snippet(path: &Path, query: &str) -> Option<String> {
    let text = read_lossy(path).ok()?;
    let re = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()?;

    let lines: Vec<&str> = text.lines().collect();
    let idx = lines.iter().position(|line| re.is_match(line))?;
    let start = idx.saturating_sub(1);
    let end = (idx + 3).min(lines.len());
    Some(lines[start..end].join("\n"))
}

/// `[score] project/branch/timestamp/category/filename:line`
pub fn format_hit(hit: &SearchHit, line: usize) -> String {
    format!("{} {}:{}", hit.score_label(), hit.display_path(), line)
}

/// Print hits one per line, optionally followed by a snippet.
pub fn print_plain<W: Write>(
    out: &mut W,
    hits: &[SearchHit],
    query: &str,
    full: bool,
) -> io::Result<()> {
    for hit in hits {
        let line = find_match_line(&hit.filepath, query);
        writeln!(out, "{}", format_hit(hit, line))?;

        if full {
            if let Some(snip) = snippet(&hit.filepath, query) {
                for l in snip.lines().take(SNIPPET_LINES) {
                    writeln!(out, "{}{}", SNIPPET_INDENT, l.trim())?;
                }
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

//! Archive path classification.
//!
//! An archive document lives at
//! `<root>/<project>/<branch>/<YYYYMMDD_HHMMSS>/[<category>/]<file>.md`.
//! [`classify`] recovers those facets from a path; anything that doesn't fit
//! the layout is not an archive document and yields `None`.

use std::path::{Component, Path};

use crate::models::{Category, Facets};

/// Parse `filepath` (under `root`) into archive facets.
///
/// Requires at least four segments below the root and a strict
/// `\d{8}_\d{6}` timestamp as the third. The fourth segment becomes the
/// category when it names a known folder, otherwise [`Category::Root`].
pub fn classify(filepath: &Path, root: &Path) -> Option<Facets> {
    let relative = filepath.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.len() < 4 {
        return None;
    }

    if !is_timestamp(&parts[2]) {
        return None;
    }

    let category = Category::from_folder(&parts[3]).unwrap_or(Category::Root);

    Some(Facets {
        project: parts[0].clone(),
        branch: parts[1].clone(),
        timestamp: parts[2].clone(),
        category,
    })
}

/// `YYYYMMDD_HHMMSS`, digits only, no calendar validation.
pub fn is_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

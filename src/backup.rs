//! Plain-text backups of uploaded highlights.
//!
//! Files land at `<dir>/<source_type>/<source>_highlights.txt` with one
//! highlight per line, which is exactly the layout `hl import` reads back.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::NewHighlight;

/// Appends `highlights` to the backup file for their source.
///
/// Appending keeps every earlier upload of the same source, so re-importing
/// the backup folder reproduces the full set.
pub fn write_backup(
    dir: &Path,
    source_type: &str,
    source: &str,
    highlights: &[NewHighlight],
) -> Result<PathBuf> {
    let type_dir = dir.join(path_component(source_type));
    std::fs::create_dir_all(&type_dir)
        .with_context(|| format!("Failed to create backup directory: {}", type_dir.display()))?;

    let path = backup_path(dir, source_type, source);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to create backup file: {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    for h in highlights {
        writeln!(writer, "{}", h.content)?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), count = highlights.len(), "backup written");
    Ok(path)
}

pub fn backup_path(dir: &Path, source_type: &str, source: &str) -> PathBuf {
    dir.join(path_component(source_type))
        .join(format!("{}_highlights.txt", path_component(source)))
}

/// Keeps a user-supplied name inside its directory.
fn path_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    if matches!(cleaned.as_str(), "" | "." | "..") {
        return "_".to_string();
    }
    // Dotfiles are excluded by the default import globs.
    match cleaned.strip_prefix('.') {
        Some(rest) => format!("_{}", rest),
        None => cleaned,
    }
}

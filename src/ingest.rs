//! Turning text into highlights.
//!
//! Two entry points feed the store:
//!
//! - [`ingest_text`] handles a single upload (HTTP or `hl add`): validate,
//!   split into lines, dual-write, then back the lines up to disk.
//! - [`import_folder`] bulk-loads a folder of line-delimited files, one
//!   source per file. Failures are per file: a bad file is logged and
//!   counted, and the import moves on.
//!
//! # Filename convention
//!
//! The source name is derived from the file name by dropping the extension,
//! dropping a trailing `_highlights` (the suffix backups are written with),
//! and turning the remaining underscores into spaces:
//!
//! ```text
//! Atomic_Habits_highlights.txt  →  "Atomic Habits"
//! Dune.txt                      →  "Dune"
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::backup;
use crate::config::Config;
use crate::error::{HighlightError, HighlightResult};
use crate::models::NewHighlight;
use crate::store::HighlightStore;

const HIGHLIGHTS_SUFFIX: &str = "_highlights";

/// Splits text into one trimmed highlight per non-empty line.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derives a source name from a file name. `None` when nothing is left.
pub fn source_name_from_file(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = stem.strip_suffix(HIGHLIGHTS_SUFFIX).unwrap_or(&stem);
    let name = stem.replace('_', " ");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

pub fn build_highlights(source: &str, source_type: &str, lines: Vec<String>) -> Vec<NewHighlight> {
    lines
        .into_iter()
        .map(|content| NewHighlight {
            source: source.to_string(),
            source_type: source_type.to_string(),
            content,
        })
        .collect()
}

/// Result of a single upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub count: usize,
    pub source_name: String,
    /// Where the lines were backed up, or `None` if backups are disabled or failed.
    pub backup_path: Option<PathBuf>,
}

/// Stores the non-empty lines of `text` under one source and backs them up.
///
/// A backup failure does not undo the write; it is logged and reported as
/// `backup_path: None`.
pub async fn ingest_text(
    store: &HighlightStore,
    config: &Config,
    source_name: &str,
    source_type: &str,
    text: &str,
) -> HighlightResult<UploadOutcome> {
    let source_name = source_name.trim();
    let source_type = source_type.trim();
    if source_name.is_empty() {
        return Err(HighlightError::MissingField("source_name"));
    }
    if source_type.is_empty() {
        return Err(HighlightError::MissingField("source_type"));
    }

    let lines = parse_lines(text);
    if lines.is_empty() {
        return Err(HighlightError::NoHighlights);
    }

    let highlights = build_highlights(source_name, source_type, lines);
    let count = store.add_highlights(&highlights).await?;
    tracing::info!(source = source_name, source_type, count, "uploaded highlights");

    let backup_path = if config.backup.enabled {
        match backup::write_backup(&config.backup.dir, source_type, source_name, &highlights) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(source = source_name, error = %e, "failed to write backup");
                None
            }
        }
    } else {
        None
    };

    Ok(UploadOutcome {
        count,
        source_name: source_name.to_string(),
        backup_path,
    })
}

/// Summary of a folder import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub files_seen: usize,
    pub files_imported: usize,
    /// Filtered out by globs, or empty after line splitting.
    pub files_skipped: usize,
    pub files_failed: usize,
    pub highlights_written: usize,
}

/// Imports every matching file directly inside `<import.root>/<folder>`.
///
/// The folder name becomes the source type of every highlight.
pub async fn import_folder(
    store: &HighlightStore,
    config: &Config,
    folder: &str,
) -> Result<ImportReport> {
    let source_type = Path::new(folder)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.trim().is_empty())
        .with_context(|| format!("Invalid import folder name: '{}'", folder))?;

    let dir = config.import.root.join(folder);
    if !dir.is_dir() {
        anyhow::bail!("Import folder does not exist: {}", dir.display());
    }

    let (include_set, exclude_set) = config.import.globsets()?;
    let mut report = ImportReport::default();

    tracing::info!(dir = %dir.display(), source_type = %source_type, "importing folder");

    let walker = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read directory entry");
                report.files_failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.files_seen += 1;

        let file_name = entry.file_name().to_string_lossy().to_string();
        if exclude_set.is_match(&file_name) || !include_set.is_match(&file_name) {
            tracing::debug!(file = %file_name, "skipped by glob filter");
            report.files_skipped += 1;
            continue;
        }

        match import_file(store, entry.path(), &file_name, &source_type).await {
            Ok(0) => {
                tracing::info!(file = %file_name, "no highlights in file");
                report.files_skipped += 1;
            }
            Ok(count) => {
                tracing::info!(file = %file_name, count, "imported file");
                report.files_imported += 1;
                report.highlights_written += count;
            }
            Err(e) => {
                tracing::warn!(file = %file_name, error = %format!("{:#}", e), "failed to import file");
                report.files_failed += 1;
            }
        }
    }

    Ok(report)
}

async fn import_file(
    store: &HighlightStore,
    path: &Path,
    file_name: &str,
    source_type: &str,
) -> Result<usize> {
    let source = source_name_from_file(file_name)
        .with_context(|| format!("Cannot derive a source name from '{}'", file_name))?;

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let highlights = build_highlights(&source, source_type, parse_lines(&text));
    let count = store.add_highlights(&highlights).await?;
    Ok(count)
}

/// `hl add`: store one line-delimited file (or stdin with `-`) under a source.
pub async fn run_add(config: &Config, source: &str, source_type: &str, file: &Path) -> Result<()> {
    let text = if file == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?
    };

    let store = HighlightStore::open(config).await?;
    let outcome = ingest_text(&store, config, source, source_type, &text).await;
    store.close().await;
    let outcome = outcome?;

    println!("add {}", outcome.source_name);
    println!("  highlights written: {}", outcome.count);
    match outcome.backup_path {
        Some(path) => println!("  backup: {}", path.display()),
        None => println!("  backup: none"),
    }
    println!("ok");
    Ok(())
}

/// `hl import`: bulk-load a folder under `[import].root`.
pub async fn run_import(config: &Config, folder: &str) -> Result<()> {
    let store = HighlightStore::open(config).await?;
    let report = import_folder(&store, config, folder).await;
    store.close().await;
    let report = report?;

    println!("import {}", folder);
    println!("  files seen: {}", report.files_seen);
    println!("  files imported: {}", report.files_imported);
    println!("  files skipped: {}", report.files_skipped);
    println!("  files failed: {}", report.files_failed);
    println!("  highlights written: {}", report.highlights_written);
    println!("ok");
    Ok(())
}

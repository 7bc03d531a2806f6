//! Core data models.
//!
//! A highlight is a single quoted excerpt tied to a source (a book or podcast
//! title) and a source type (its category). These types flow from the import
//! and upload paths into SQLite and back out through the CLI and HTTP API.

use serde::Serialize;

/// A stored highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub id: i64,
    pub source: String,
    pub source_type: String,
    pub content: String,
}

/// A highlight that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHighlight {
    pub source: String,
    pub source_type: String,
    pub content: String,
}

/// A distinct `(source, source_type)` pair and how many highlights it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub name: String,
    pub source_type: String,
    pub count: i64,
}

/// A keyword search hit from the full-text index.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Row id in `highlights`; `None` when the primary row has since been flushed.
    pub highlight_id: Option<i64>,
    pub source: String,
    pub content: String,
    /// Content with matched terms wrapped in `[` and `]`.
    pub snippet: String,
    /// Higher is better.
    pub score: f64,
}

/// Row counts for `hl stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub highlights: i64,
    pub indexed: i64,
    pub sources: i64,
    pub by_type: Vec<(String, i64)>,
}

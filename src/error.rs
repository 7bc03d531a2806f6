//! Typed errors for failures callers need to tell apart.
//!
//! Orchestration code stays on `anyhow`; these variants exist so the HTTP
//! layer can map validation problems to 400s without inspecting messages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HighlightError {
    /// Search called with an empty or whitespace-only query.
    #[error("query must not be empty")]
    EmptyQuery,

    /// A required text field was blank.
    #[error("{0} must not be empty")]
    MissingField(&'static str),

    /// An upload or file contained no non-empty lines.
    #[error("no highlights found in input")]
    NoHighlights,

    /// `flush` named a table outside the known set.
    #[error("unknown table '{0}': expected highlights, highlights_fts or all")]
    UnknownTable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl HighlightError {
    /// Whether the error was caused by caller input rather than the store.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

pub type HighlightResult<T> = std::result::Result<T, HighlightError>;

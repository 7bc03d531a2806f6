//! Highlight storage: the primary `highlights` table and its FTS5 index.
//!
//! Every write goes through [`HighlightStore::add_highlights`], which inserts
//! each record into `highlights` and `highlights_fts` inside a single
//! transaction. A failed batch leaves neither table touched.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::config::Config;
use crate::db;
use crate::error::{HighlightError, HighlightResult};
use crate::migrate;
use crate::models::{Highlight, NewHighlight, SearchHit, Source, StoreStats};

/// A table that `flush` is allowed to truncate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTarget {
    Highlights,
    SearchIndex,
}

impl FlushTarget {
    pub fn table_name(self) -> &'static str {
        match self {
            FlushTarget::Highlights => "highlights",
            FlushTarget::SearchIndex => "highlights_fts",
        }
    }

    /// Resolves table names (or `all`) into a deduplicated target list.
    ///
    /// Every name is validated before anything is returned, so a typo never
    /// results in a partial flush.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> HighlightResult<Vec<FlushTarget>> {
        let mut targets = Vec::new();
        for name in names {
            let expanded = if name.as_ref().trim() == "all" {
                vec![FlushTarget::Highlights, FlushTarget::SearchIndex]
            } else {
                vec![name.as_ref().parse()?]
            };
            for t in expanded {
                if !targets.contains(&t) {
                    targets.push(t);
                }
            }
        }
        Ok(targets)
    }
}

impl FromStr for FlushTarget {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "highlights" => Ok(FlushTarget::Highlights),
            "highlights_fts" => Ok(FlushTarget::SearchIndex),
            other => Err(HighlightError::UnknownTable(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct HighlightStore {
    pool: SqlitePool,
}

impl HighlightStore {
    /// Connects to the configured database and runs migrations.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Writes a batch to the primary table and the search index.
    ///
    /// Returns the number of highlights written.
    pub async fn add_highlights(&self, highlights: &[NewHighlight]) -> HighlightResult<usize> {
        for h in highlights {
            if h.source.trim().is_empty() {
                return Err(HighlightError::MissingField("source"));
            }
            if h.source_type.trim().is_empty() {
                return Err(HighlightError::MissingField("source_type"));
            }
            if h.content.trim().is_empty() {
                return Err(HighlightError::MissingField("content"));
            }
        }
        if highlights.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for h in highlights {
            let id = sqlx::query(
                "INSERT INTO highlights (source, source_type, content) VALUES (?, ?, ?)",
            )
            .bind(&h.source)
            .bind(&h.source_type)
            .bind(&h.content)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            sqlx::query("INSERT INTO highlights_fts (highlight_id, title, content) VALUES (?, ?, ?)")
                .bind(id)
                .bind(&h.source)
                .bind(&h.content)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(count = highlights.len(), "highlights written");
        Ok(highlights.len())
    }

    /// Up to `limit` highlights in random order.
    pub async fn random(&self, limit: i64) -> HighlightResult<Vec<Highlight>> {
        if limit < 1 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, source, source_type, content FROM highlights ORDER BY RANDOM() LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_highlight).collect())
    }

    pub async fn sources(&self) -> HighlightResult<Vec<Source>> {
        let rows = sqlx::query(
            r#"
            SELECT source, source_type, COUNT(*) AS count
            FROM highlights
            GROUP BY source, source_type
            ORDER BY source, source_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Source {
                name: row.get("source"),
                source_type: row.get("source_type"),
                count: row.get("count"),
            })
            .collect())
    }

    /// All highlights of one source, oldest first.
    pub async fn by_source(&self, name: &str) -> HighlightResult<Vec<Highlight>> {
        if name.trim().is_empty() {
            return Err(HighlightError::MissingField("source"));
        }

        let rows = sqlx::query(
            "SELECT id, source, source_type, content FROM highlights WHERE source = ? ORDER BY id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_highlight).collect())
    }

    /// Keyword search over source titles and highlight content, best match first.
    pub async fn search(&self, query: &str, limit: i64) -> HighlightResult<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(HighlightError::EmptyQuery);
        }
        let Some(fts_query) = to_fts_query(query) else {
            return Ok(Vec::new());
        };
        if limit < 1 {
            return Ok(Vec::new());
        }

        tracing::debug!(query, fts_query = %fts_query, limit, "searching");

        let rows = sqlx::query(
            r#"
            SELECT highlights.id AS highlight_id,
                   highlights_fts.title AS title,
                   highlights_fts.content AS content,
                   highlights_fts.rank AS rank,
                   snippet(highlights_fts, 2, '[', ']', '...', 32) AS snippet
            FROM highlights_fts
            LEFT JOIN highlights ON highlights.id = highlights_fts.highlight_id
            WHERE highlights_fts MATCH ?
            ORDER BY highlights_fts.rank
            LIMIT ?
            "#,
        )
        .bind(&fts_query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                SearchHit {
                    highlight_id: row.get("highlight_id"),
                    source: row.get("title"),
                    content: row.get("content"),
                    snippet: row.get("snippet"),
                    score: -rank, // bm25 rank is lower-is-better
                }
            })
            .collect())
    }

    /// Deletes every row of each target table in one transaction.
    ///
    /// Returns `(table, rows_deleted)` per target.
    pub async fn flush(&self, targets: &[FlushTarget]) -> HighlightResult<Vec<(&'static str, u64)>> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = Vec::with_capacity(targets.len());

        for target in targets {
            let sql = match target {
                FlushTarget::Highlights => "DELETE FROM highlights",
                FlushTarget::SearchIndex => "DELETE FROM highlights_fts",
            };
            let rows = sqlx::query(sql).execute(&mut *tx).await?.rows_affected();
            deleted.push((target.table_name(), rows));
        }

        tx.commit().await?;

        for (table, rows) in &deleted {
            tracing::info!(table, rows, "flushed table");
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> HighlightResult<StoreStats> {
        let highlights: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM highlights")
            .fetch_one(&self.pool)
            .await?;
        let indexed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM highlights_fts")
            .fetch_one(&self.pool)
            .await?;
        let sources: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM (SELECT DISTINCT source, source_type FROM highlights)")
                .fetch_one(&self.pool)
                .await?;

        let type_rows = sqlx::query(
            r#"
            SELECT source_type, COUNT(*) AS count
            FROM highlights
            GROUP BY source_type
            ORDER BY count DESC, source_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StoreStats {
            highlights,
            indexed,
            sources,
            by_type: type_rows
                .iter()
                .map(|row| (row.get::<String, _>("source_type"), row.get::<i64, _>("count")))
                .collect(),
        })
    }
}

fn row_to_highlight(row: &SqliteRow) -> Highlight {
    Highlight {
        id: row.get("id"),
        source: row.get("source"),
        source_type: row.get("source_type"),
        content: row.get("content"),
    }
}

/// Turns free text into an FTS5 expression that cannot fail to parse.
///
/// Each whitespace-separated term becomes a quoted string, so operators and
/// punctuation are matched literally and terms are implicitly ANDed. Terms
/// without any letter or digit are dropped. Returns `None` when nothing
/// searchable remains.
pub fn to_fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

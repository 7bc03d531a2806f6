//! `hl search`: keyword search from the command line.
//!
//! Scoring and query escaping live in [`crate::store`]; this module only
//! formats the hits.

use anyhow::Result;

use crate::config::Config;
use crate::models::SearchHit;
use crate::store::HighlightStore;

pub async fn run_search(config: &Config, query: &str, limit: Option<i64>) -> Result<()> {
    let store = HighlightStore::open(config).await?;
    let limit = limit.unwrap_or(config.retrieval.search_limit);
    let hits = store.search(query, limit).await?;
    store.close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        print!("{}", format_hit(i + 1, hit));
    }

    Ok(())
}

fn format_hit(position: usize, hit: &SearchHit) -> String {
    let id = hit
        .highlight_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "(unlinked)".to_string());
    format!(
        "{}. [{:.2}] {}\n    \"{}\"\n    id: {}\n\n",
        position,
        hit.score,
        hit.source,
        hit.snippet.replace('\n', " ").trim(),
        id
    )
}

//! Browsing commands: `hl sources`, `hl show`, `hl random`.

use anyhow::Result;

use crate::config::Config;
use crate::models::Highlight;
use crate::store::HighlightStore;

pub async fn list_sources(config: &Config) -> Result<()> {
    let store = HighlightStore::open(config).await?;
    let sources = store.sources().await?;
    store.close().await;

    if sources.is_empty() {
        println!("No sources.");
        return Ok(());
    }

    println!("{:<40} {:<12} {:>6}", "SOURCE", "TYPE", "COUNT");
    for s in &sources {
        println!("{:<40} {:<12} {:>6}", s.name, s.source_type, s.count);
    }

    Ok(())
}

pub async fn run_show(config: &Config, source: &str) -> Result<()> {
    let store = HighlightStore::open(config).await?;
    let highlights = store.by_source(source).await?;
    store.close().await;

    if highlights.is_empty() {
        println!("No highlights for '{}'.", source);
        return Ok(());
    }

    println!("--- {} ({}) ---", source, highlights.len());
    print_highlights(&highlights, false);
    Ok(())
}

pub async fn run_random(config: &Config, limit: Option<i64>) -> Result<()> {
    let store = HighlightStore::open(config).await?;
    let highlights = store
        .random(limit.unwrap_or(config.retrieval.random_limit))
        .await?;
    store.close().await;

    if highlights.is_empty() {
        println!("No highlights.");
        return Ok(());
    }

    print_highlights(&highlights, true);
    Ok(())
}

fn print_highlights(highlights: &[Highlight], with_source: bool) {
    for h in highlights {
        if with_source {
            println!("[{}] {} ({})", h.id, h.source, h.source_type);
        } else {
            println!("[{}]", h.id);
        }
        println!("{}", h.content);
        println!();
    }
}

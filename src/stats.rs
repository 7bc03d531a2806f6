//! Database statistics.
//!
//! A quick summary of what's stored: row counts for the primary table and
//! the search index, and a per-type breakdown. A gap between the two counts
//! means one table was flushed without the other.

use anyhow::Result;

use crate::config::Config;
use crate::store::HighlightStore;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = HighlightStore::open(config).await?;
    let stats = store.stats().await?;
    store.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Highlights — Database Stats");
    println!("===========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Highlights:  {}", stats.highlights);
    println!("  Indexed:     {}", stats.indexed);
    println!("  Sources:     {}", stats.sources);

    if stats.highlights != stats.indexed {
        println!();
        println!("  Note: primary table and search index differ in size.");
    }

    if !stats.by_type.is_empty() {
        println!();
        println!("  By type:");
        println!("  {:<24} {:>8}", "TYPE", "COUNT");
        println!("  {}", "-".repeat(33));
        for (source_type, count) in &stats.by_type {
            println!("  {:<24} {:>8}", source_type, count);
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

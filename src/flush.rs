use anyhow::{bail, Result};

use crate::config::Config;
use crate::store::{FlushTarget, HighlightStore};

/// `hl flush`: truncate the named tables.
pub async fn run_flush(config: &Config, tables: &[String]) -> Result<()> {
    if tables.is_empty() {
        bail!("Nothing to flush. Name highlights, highlights_fts or all.");
    }
    let targets = FlushTarget::parse_all(tables)?;

    let store = HighlightStore::open(config).await?;
    let deleted = store.flush(&targets).await;
    store.close().await;

    for (table, rows) in deleted? {
        println!("flushed {}: {} rows", table, rows);
    }
    Ok(())
}

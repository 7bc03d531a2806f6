//! # Highlights CLI (`hl`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hl init` | Create the SQLite database and run schema migrations |
//! | `hl serve` | Start the HTTP server |
//! | `hl add --source <name> --type <type> <file>` | Store one line-delimited file |
//! | `hl import <folder>` | Bulk-load every file in `<import.root>/<folder>` |
//! | `hl flush <table>...` | Delete all rows of `highlights`, `highlights_fts` or `all` |
//! | `hl search "<query>"` | Keyword search |
//! | `hl random` | Print a random sample |
//! | `hl sources` | List sources |
//! | `hl show <source>` | Print every highlight of one source |
//! | `hl stats` | Row counts and per-type breakdown |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use highlights::{config, flush, ingest, migrate, search, server, sources, stats};

/// Highlights — store, browse and search quotes from books and podcasts.
#[derive(Parser)]
#[command(name = "hl", version)]
struct Cli {
    /// Path to configuration file (TOML). Missing sections use defaults.
    #[arg(long, global = true, default_value = "./config/hl.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the `highlights` table and the
    /// `highlights_fts` search index. Running it again is safe.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Store one line-delimited file under a source. Use `-` for stdin.
    Add {
        /// Source name, e.g. a book or podcast title.
        #[arg(long)]
        source: String,

        /// Source type, e.g. `book` or `podcast`.
        #[arg(long = "type")]
        source_type: String,

        file: PathBuf,
    },

    /// Bulk-load every file in `<import.root>/<folder>`.
    ///
    /// The folder name becomes the source type; each file name becomes a
    /// source name (`Atomic_Habits_highlights.txt` → `Atomic Habits`).
    Import { folder: String },

    /// Delete every row of the named tables.
    Flush {
        /// `highlights`, `highlights_fts`, or `all`.
        #[arg(required = true)]
        tables: Vec<String>,
    },

    /// Keyword search over sources and highlight content.
    Search {
        query: String,

        /// Maximum number of results (defaults to `[retrieval].search_limit`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print a random sample of highlights.
    Random {
        /// Sample size (defaults to `[retrieval].random_limit`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// List sources with their type and highlight count.
    Sources,

    /// Print every highlight of one source.
    Show { source: String },

    /// Show row counts and a per-type breakdown.
    Stats,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config file not found, using defaults");
        config::Config::default()
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Add {
            source,
            source_type,
            file,
        } => {
            ingest::run_add(&cfg, &source, &source_type, &file).await?;
        }
        Commands::Import { folder } => {
            ingest::run_import(&cfg, &folder).await?;
        }
        Commands::Flush { tables } => {
            flush::run_flush(&cfg, &tables).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Random { limit } => {
            sources::run_random(&cfg, limit).await?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Show { source } => {
            sources::run_show(&cfg, &source).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

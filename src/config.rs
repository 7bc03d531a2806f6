//! TOML configuration.
//!
//! Every section is optional; an empty file yields a working setup that
//! stores `./highlights.db` and serves on `127.0.0.1:8080`.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./highlights.db"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 << 20
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_random_limit")]
    pub random_limit: i64,
    #[serde(default = "default_search_limit")]
    pub search_limit: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            random_limit: default_random_limit(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_random_limit() -> i64 {
    10
}
fn default_search_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_backup_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_backup_dir")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            root: default_backup_dir(),
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["*.txt".to_string()]
}
fn default_exclude_globs() -> Vec<String> {
    vec![".*".to_string()]
}

impl ImportConfig {
    /// Compiled (include, exclude) matchers for file names inside an import folder.
    pub fn globsets(&self) -> Result<(GlobSet, GlobSet)> {
        Ok((
            build_globset(&self.include_globs)?,
            build_globset(&self.exclude_globs)?,
        ))
    }
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.random_limit < 1 {
        anyhow::bail!("retrieval.random_limit must be >= 1");
    }
    if config.retrieval.search_limit < 1 {
        anyhow::bail!("retrieval.search_limit must be >= 1");
    }
    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    // Surface bad patterns at startup rather than on the first import.
    config.import.globsets()?;

    Ok(config)
}

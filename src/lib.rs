//! # Highlights
//!
//! A personal store for text highlights (quotes from books and podcasts)
//! with keyword search and bulk import.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────────────┐
//! │ Upload/files │──▶│   Ingest    │──▶│ SQLite               │
//! │ (HTTP, CLI)  │   │ split lines │   │ highlights + FTS5    │
//! └──────────────┘   └──────┬──────┘   └──────────┬───────────┘
//!                           ▼                     │
//!                      ┌──────────┐     ┌─────────┴─────────┐
//!                      │ Backups  │     ▼                   ▼
//!                      └──────────┘ ┌────────┐        ┌──────────┐
//!                                   │  CLI   │        │   HTTP   │
//!                                   │  (hl)  │        │  (JSON)  │
//!                                   └────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hl init                                     # create database
//! hl add --source Dune --type book dune.txt   # store one file
//! hl import podcast                           # bulk-load backups/podcast
//! hl search "mind killer"
//! hl serve                                    # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Primary table + FTS5 index, dual write |
//! | [`ingest`] | Line splitting, filename parsing, folder import |
//! | [`backup`] | Plain-text backups of uploads |
//! | [`server`] | HTTP JSON server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod flush;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod search;
pub mod server;
pub mod sources;
pub mod stats;
pub mod store;

// Reel - incremental movie catalogue replication
// Copyright (c) 2025 Reel Contributors
// Licensed under the MIT License

//! # Reel - incremental movie replication
//!
//! Reel copies movie records between PostgreSQL, Elasticsearch and SQLite,
//! one bounded chunk per run, tracking progress with an `updated_at`
//! watermark.
//!
//! ## Overview
//!
//! - **Extracting** records changed since the watermark, oldest first
//! - **Transforming** them through a backend-independent canonical shape
//! - **Loading** them with upserts keyed by film id
//! - **Committing** the watermark only after the load succeeded
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Run coordination, dispatch, transforms and watermark state
//! - [`catalog`] - Logical fields and their physical form in each backend
//! - [`adapters`] - PostgreSQL, Elasticsearch and SQLite backends
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reel::config::load_config;
//! use reel::core::sync::SyncCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("reel.toml")?;
//!     let coordinator = SyncCoordinator::from_config(&config).await?;
//!
//!     let summary = coordinator.run_once().await?;
//!     println!("Loaded {} films", summary.loaded);
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental Sync
//!
//! Each run reads at most `chunk_size` records with
//! `updated_at >= watermark`. The boundary record is read again on the next
//! run; upserts make that harmless. A failed load leaves the watermark in
//! place so nothing is skipped.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`] with a
//! [`domain::ReelError`]; the CLI maps error kinds to exit codes.

pub mod adapters;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

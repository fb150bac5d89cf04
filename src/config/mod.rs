//! Configuration management for Reel.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Reel uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `REEL_*` environment overrides
//! - Default values for optional settings
//! - Validation of both connection blocks before any I/O
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use reel::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("reel.toml")?;
//!
//! println!("Source: {}", config.source.kind);
//! println!("Destination: {}", config.destination.kind);
//! println!("Chunk size: {}", config.sync.chunk_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [source]
//! kind = "postgres"
//!
//! [source.postgresql]
//! connection_string = "${REEL_PG_URL}"
//! schema = "content"
//! table = "film_work"
//!
//! [destination]
//! kind = "elasticsearch"
//!
//! [destination.elasticsearch]
//! url = "http://localhost:9200"
//! index = "movies"
//!
//! [sync]
//! chunk_size = 100
//! fields = ["film_id", "title", "rating", "genre", "actors", "updated_at"]
//!
//! [sync.genres]
//! "3d8d9bf5-0d90-4353-88ba-4ccc5d2c07ff" = "Action"
//!
//! [state]
//! path = "reel_state.json"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, ConnectionConfig, ElasticsearchConfig, LoggingConfig, PostgreSQLConfig,
    ReelConfig, SqliteConfig, StateConfig, SyncConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};

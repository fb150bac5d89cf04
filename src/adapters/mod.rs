//! Datastore integrations for Reel.
//!
//! - [`backend`] - the [`MovieBackend`](backend::MovieBackend) contract and the kind registry
//! - [`postgresql`] - relational store (deadpool-postgres)
//! - [`elasticsearch`] - search engine (REST over reqwest)
//! - [`sqlite`] - embedded file store (rusqlite)
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern**: the coordinator only holds
//! `Arc<dyn MovieBackend>` values, so any pair of kinds can be source and
//! destination, and tests can substitute in-memory fakes.
//!
//! ```rust,no_run
//! use reel::adapters::backend::create_backend;
//! use reel::config::{ConnectionConfig, SqliteConfig};
//! use reel::domain::BackendKind;
//!
//! # async fn example() -> reel::domain::Result<()> {
//! let config = ConnectionConfig {
//!     kind: BackendKind::Sqlite,
//!     postgresql: None,
//!     elasticsearch: None,
//!     sqlite: Some(SqliteConfig {
//!         path: "movies.db".to_string(),
//!         table: "film_work".to_string(),
//!     }),
//! };
//!
//! let backend = create_backend(&config).await?;
//! backend.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod elasticsearch;
pub mod postgresql;
pub mod sqlite;

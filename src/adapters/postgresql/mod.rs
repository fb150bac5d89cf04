//! PostgreSQL database integration
//!
//! Reads changed films with a two-phase query (changed ids, then an
//! aggregating join over person and genre associations) and writes films
//! with transactional multi-row upserts.

pub mod adapter;
pub mod client;
pub mod sql;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;

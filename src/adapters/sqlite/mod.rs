//! SQLite integration
//!
//! A single flat film table; nested lists are stored as JSON text.

pub mod adapter;
pub mod sql;

pub use adapter::SqliteAdapter;

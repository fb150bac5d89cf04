//! Elasticsearch integration
//!
//! Changed documents are read with a `range` query on `updated_at`; films are
//! written with `_bulk` index actions keyed by film id. The index is created
//! on demand with a strict mapping derived from the field catalog.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::ElasticsearchAdapter;
pub use client::ElasticsearchClient;

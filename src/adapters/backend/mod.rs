//! Backend abstraction layer
//!
//! The [`MovieBackend`] trait is the single interface the sync coordinator
//! sees; [`create_backend`] is the registry from [`BackendKind`](crate::domain::BackendKind)
//! to implementation.

pub mod factory;
pub mod traits;

pub use factory::create_backend;
pub use traits::{Extraction, LoadAck, LoadBatch, MovieBackend, RawRecord};

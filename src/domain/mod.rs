//! Domain models and types for Reel.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Canonical movie shape** ([`MovieRecord`], [`Person`], [`Genre`])
//! - **Strongly-typed identifiers** ([`FilmId`])
//! - **Exchange timestamps** ([`SyncTimestamp`]) used for `created_at`,
//!   `updated_at` and the watermark cursor
//! - **Backend kinds** ([`BackendKind`])
//! - **Error types** ([`ReelError`]) and the [`Result`] alias
//!
//! # Builder Pattern
//!
//! ```rust
//! use reel::domain::{MovieRecordBuilder, SyncTimestamp};
//! use std::str::FromStr;
//!
//! # fn example() -> reel::domain::Result<()> {
//! let record = MovieRecordBuilder::new()
//!     .film_id("3d825f60-9fff-4dfe-b294-1a45fa1e115d")
//!     .title("Star Wars")
//!     .updated_at(SyncTimestamp::from_str("2024-01-01 10:00:00").unwrap())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod kind;
pub mod movie;
pub mod result;
pub mod timestamp;

pub use errors::ReelError;
pub use ids::FilmId;
pub use kind::BackendKind;
pub use movie::{Genre, MovieRecord, MovieRecordBuilder, Person};
pub use result::Result;
pub use timestamp::SyncTimestamp;

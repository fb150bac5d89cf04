//! Core business logic for Reel.
//!
//! # Modules
//!
//! - [`dispatch`] - Backend kinds to branch plans
//! - [`state`] - Watermark model, state storage and the commit boundary
//! - [`transform`] - Canonical conversion and destination shaping
//! - [`sync`] - The run coordinator
//!
//! # Sync Workflow
//!
//! 1. **Plan**: Resolve backend kinds and the field selection (no I/O)
//! 2. **Read State**: Load the committed watermark
//! 3. **Extract**: At most `chunk_size` records with `updated_at >= watermark`
//! 4. **Transform**: Canonical shape, genre names, destination encoding
//! 5. **Provision**: Create the destination table or index if absent
//! 6. **Load**: Upsert the batch keyed by film id
//! 7. **Commit**: Advance the watermark to the last extracted `updated_at`
//!
//! # Example
//!
//! ```rust,no_run
//! use reel::config::load_config;
//! use reel::core::sync::SyncCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("reel.toml")?;
//! let coordinator = SyncCoordinator::from_config(&config).await?;
//!
//! let summary = coordinator.run_once().await?;
//! println!("Loaded: {}", summary.loaded);
//! println!("Watermark: {}", summary.watermark_after);
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod state;
pub mod sync;
pub mod transform;

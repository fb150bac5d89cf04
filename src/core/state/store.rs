//! Watermark store
//!
//! The commit boundary of a sync run. [`WatermarkStore::get`] is read once
//! before extraction; [`WatermarkStore::commit`] is called only after the
//! destination acknowledged the whole batch.

use crate::core::state::storage::StateStorage;
use crate::core::state::watermark::Watermark;
use crate::domain::{Result, SyncTimestamp};
use std::sync::Arc;

/// Watermark store scoped to one pipeline key
#[derive(Clone)]
pub struct WatermarkStore {
    storage: Arc<dyn StateStorage + Send + Sync>,
    key: String,
}

impl WatermarkStore {
    pub fn new(storage: Arc<dyn StateStorage + Send + Sync>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stored entry, or a fresh one if nothing was stored yet
    ///
    /// # Errors
    ///
    /// Returns a state error if the storage cannot be read.
    pub async fn current(&self) -> Result<Watermark> {
        Ok(self
            .storage
            .load_watermark(&self.key)
            .await?
            .unwrap_or_else(|| Watermark::new(self.key.clone())))
    }

    /// Last committed timestamp (minimum timestamp when unset)
    ///
    /// # Errors
    ///
    /// Returns a state error if the storage cannot be read.
    pub async fn get(&self) -> Result<SyncTimestamp> {
        Ok(self.current().await?.last_synced)
    }

    /// Record that a run has started
    pub async fn mark_started(&self) -> Result<Watermark> {
        let mut watermark = self.current().await?;
        watermark.mark_started();
        self.storage.save_watermark(&watermark).await?;
        Ok(watermark)
    }

    /// Record that a run failed, leaving `last_synced` untouched
    pub async fn mark_failed(&self) -> Result<()> {
        let mut watermark = self.current().await?;
        watermark.mark_failed();
        self.storage.save_watermark(&watermark).await
    }

    /// Record a run that finished without moving the marker
    pub async fn mark_completed(&self) -> Result<()> {
        let mut watermark = self.current().await?;
        watermark.mark_completed();
        self.storage.save_watermark(&watermark).await
    }

    /// Durably commit a new marker after a fully loaded batch
    ///
    /// A timestamp older than the stored marker is refused with a warning;
    /// the run is still recorded as completed. Returns whether the marker
    /// moved.
    ///
    /// # Errors
    ///
    /// Returns a state error if the storage cannot be written.
    pub async fn commit(&self, timestamp: SyncTimestamp, loaded: usize) -> Result<bool> {
        let mut watermark = self.current().await?;
        let previous = watermark.last_synced;
        let advanced = watermark.advance(timestamp, loaded);

        if advanced {
            tracing::info!(
                key = %self.key,
                previous = %previous,
                committed = %timestamp,
                loaded,
                "Committing watermark"
            );
        } else {
            tracing::warn!(
                key = %self.key,
                stored = %previous,
                refused = %timestamp,
                "Refusing to move watermark backwards"
            );
        }

        watermark.mark_completed();
        self.storage.save_watermark(&watermark).await?;
        Ok(advanced)
    }
}

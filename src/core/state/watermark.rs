//! Watermark model for tracking sync state
//!
//! A watermark is the durable, run-to-run marker of how far a pipeline has
//! replicated: the `updated_at` of the last record whose batch was fully
//! loaded, plus bookkeeping about the most recent run.

use crate::domain::SyncTimestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// A run is in progress (or crashed before finishing)
    InProgress,
    /// The last run completed successfully
    Completed,
    /// The last run failed
    Failed,
    /// No run has been recorded
    #[default]
    NotStarted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::NotStarted => "not_started",
        };
        f.write_str(s)
    }
}

/// Durable sync marker for one pipeline key
///
/// # Examples
///
/// ```
/// use reel::core::state::watermark::{RunStatus, WatermarkBuilder};
/// use reel::domain::SyncTimestamp;
///
/// let watermark = WatermarkBuilder::new("movies_updated_state")
///     .last_synced(SyncTimestamp::parse("2024-01-01 10:00:00").unwrap())
///     .records_synced_count(100)
///     .build();
///
/// assert_eq!(watermark.records_synced_count, 100);
/// assert_eq!(watermark.last_run_status, RunStatus::NotStarted);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    /// Pipeline key this marker belongs to
    pub key: String,

    /// `updated_at` of the last record in the last committed batch
    #[serde(default)]
    pub last_synced: SyncTimestamp,

    /// Total number of records loaded under this key
    #[serde(default)]
    pub records_synced_count: u64,

    /// When the most recent run started
    #[serde(default)]
    pub last_run_started_at: Option<DateTime<Utc>>,

    /// When the most recent run finished (None while in progress)
    #[serde(default)]
    pub last_run_completed_at: Option<DateTime<Utc>>,

    /// Status of the most recent run
    #[serde(default)]
    pub last_run_status: RunStatus,
}

impl Watermark {
    /// Fresh marker positioned at the minimum timestamp
    pub fn new(key: impl Into<String>) -> Self {
        WatermarkBuilder::new(key).build()
    }

    pub fn is_in_progress(&self) -> bool {
        self.last_run_status == RunStatus::InProgress
    }

    pub fn is_failed(&self) -> bool {
        self.last_run_status == RunStatus::Failed
    }

    /// Duration of the most recent run if it finished
    pub fn last_run_duration(&self) -> Option<chrono::Duration> {
        match (self.last_run_started_at, self.last_run_completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }

    pub fn mark_started(&mut self) {
        self.last_run_started_at = Some(Utc::now());
        self.last_run_completed_at = None;
        self.last_run_status = RunStatus::InProgress;
    }

    pub fn mark_completed(&mut self) {
        self.last_run_completed_at = Some(Utc::now());
        self.last_run_status = RunStatus::Completed;
    }

    pub fn mark_failed(&mut self) {
        self.last_run_completed_at = Some(Utc::now());
        self.last_run_status = RunStatus::Failed;
    }

    /// Move the marker forward after a loaded batch
    ///
    /// Returns `false` and leaves the marker untouched when `timestamp` is
    /// older than the stored value.
    pub fn advance(&mut self, timestamp: SyncTimestamp, loaded: usize) -> bool {
        if timestamp < self.last_synced {
            return false;
        }
        self.last_synced = timestamp;
        self.records_synced_count += loaded as u64;
        true
    }
}

/// Builder for creating Watermark instances
pub struct WatermarkBuilder {
    key: String,
    last_synced: SyncTimestamp,
    records_synced_count: u64,
    last_run_started_at: Option<DateTime<Utc>>,
    last_run_completed_at: Option<DateTime<Utc>>,
    last_run_status: RunStatus,
}

impl WatermarkBuilder {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            last_synced: SyncTimestamp::min(),
            records_synced_count: 0,
            last_run_started_at: None,
            last_run_completed_at: None,
            last_run_status: RunStatus::NotStarted,
        }
    }

    pub fn last_synced(mut self, timestamp: SyncTimestamp) -> Self {
        self.last_synced = timestamp;
        self
    }

    pub fn records_synced_count(mut self, count: u64) -> Self {
        self.records_synced_count = count;
        self
    }

    pub fn last_run_started_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.last_run_started_at = Some(timestamp);
        self
    }

    pub fn last_run_completed_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.last_run_completed_at = Some(timestamp);
        self
    }

    pub fn last_run_status(mut self, status: RunStatus) -> Self {
        self.last_run_status = status;
        self
    }

    pub fn build(self) -> Watermark {
        Watermark {
            key: self.key,
            last_synced: self.last_synced,
            records_synced_count: self.records_synced_count,
            last_run_started_at: self.last_run_started_at,
            last_run_completed_at: self.last_run_completed_at,
            last_run_status: self.last_run_status,
        }
    }
}

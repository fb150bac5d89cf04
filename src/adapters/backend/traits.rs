//! Backend abstraction traits
//!
//! This module defines the contract every datastore adapter implements so the
//! sync coordinator can move movie records between any pair of backends.

use crate::catalog::FieldSelection;
use crate::domain::{BackendKind, FilmId, MovieRecord, Result, SyncTimestamp};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A record as read from a backend, keyed by physical column/document key
pub type RawRecord = Map<String, Value>;

/// Result of one bounded extraction
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Changed records ordered ascending by `updated_at`
    pub records: Vec<RawRecord>,

    /// `updated_at` of the last returned record
    pub watermark_candidate: Option<SyncTimestamp>,
}

impl Extraction {
    /// An extraction that found nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Records shaped for one destination
#[derive(Debug, Clone, PartialEq)]
pub enum LoadBatch {
    /// Flat rows in selection order; nested lists are JSON text
    Rows(Vec<Vec<Option<String>>>),

    /// Documents keyed by film id; nested lists are JSON arrays
    Documents(Vec<(FilmId, Value)>),
}

impl LoadBatch {
    pub fn len(&self) -> usize {
        match self {
            LoadBatch::Rows(rows) => rows.len(),
            LoadBatch::Documents(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acknowledgement of a fully applied load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadAck {
    /// Number of records upserted
    pub loaded: usize,
}

/// Datastore adapter for movie records
///
/// Implementations exist for each [`BackendKind`]. All operations take the
/// run's resolved [`FieldSelection`]; adapters never consult field names
/// outside of it.
#[async_trait]
pub trait MovieBackend: Send + Sync {
    /// Kind of datastore this adapter talks to
    fn kind(&self) -> BackendKind;

    /// Human readable target with credentials redacted
    fn describe(&self) -> String;

    /// Test the connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Read at most `chunk_size` records with `updated_at >= watermark`
    ///
    /// Records are returned ascending by `updated_at`. An empty result is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an extraction error if the read fails.
    async fn extract(
        &self,
        watermark: SyncTimestamp,
        chunk_size: usize,
        selection: &FieldSelection,
    ) -> Result<Extraction>;

    /// Create the destination table or index if absent
    ///
    /// Calling this repeatedly with the same selection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a provisioning error for anything other than "already exists".
    async fn ensure_schema(&self, selection: &FieldSelection) -> Result<()>;

    /// Encode canonical records in this backend's storage shape
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a nested field cannot be encoded.
    fn transform_for_load(
        &self,
        records: &[MovieRecord],
        selection: &FieldSelection,
    ) -> Result<LoadBatch>;

    /// Upsert a batch keyed by film id
    ///
    /// Either the whole batch is applied and acknowledged or the call fails.
    ///
    /// # Errors
    ///
    /// Returns a load error if any part of the batch is rejected.
    async fn load(&self, batch: LoadBatch, selection: &FieldSelection) -> Result<LoadAck>;
}

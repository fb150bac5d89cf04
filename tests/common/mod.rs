//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use reel::adapters::backend::{Extraction, LoadAck, LoadBatch, MovieBackend, RawRecord};
use reel::catalog::{Field, FieldCatalog, FieldSelection};
use reel::core::transform::to_row;
use reel::domain::{BackendKind, MovieRecord, ReelError, Result, SyncTimestamp};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Flat-row store held in memory, shaped like the relational backends
///
/// Rows are kept as raw records keyed by id, nested lists as JSON text.
/// `fail_after` makes the next load write that many rows and then fail,
/// the way a non-transactional bulk write can.
pub struct MemoryBackend {
    kind: BackendKind,
    rows: Mutex<BTreeMap<String, RawRecord>>,
    fail_after: Mutex<Option<usize>>,
    pub schema_calls: AtomicUsize,
    pub load_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            rows: Mutex::new(BTreeMap::new()),
            fail_after: Mutex::new(None),
            schema_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_records(kind: BackendKind, records: Vec<RawRecord>) -> Self {
        let backend = Self::new(kind);
        {
            let mut rows = backend.rows.lock().unwrap();
            for record in records {
                let id = record["id"].as_str().unwrap().to_string();
                rows.insert(id, record);
            }
        }
        backend
    }

    /// Make the next load write `rows` rows and then fail
    pub fn fail_next_load_after(&self, rows: usize) {
        *self.fail_after.lock().unwrap() = Some(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> BTreeMap<String, RawRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl MovieBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn describe(&self) -> String {
        format!("memory ({})", self.kind)
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn extract(
        &self,
        watermark: SyncTimestamp,
        chunk_size: usize,
        selection: &FieldSelection,
    ) -> Result<Extraction> {
        let rows = self.rows.lock().unwrap();
        let mut changed: Vec<(SyncTimestamp, &String, &RawRecord)> = rows
            .iter()
            .filter_map(|(id, row)| {
                let updated = SyncTimestamp::parse(row.get("updated_at")?.as_str()?).ok()?;
                (updated >= watermark).then_some((updated, id, row))
            })
            .collect();
        changed.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        changed.truncate(chunk_size);

        let watermark_candidate = changed.last().map(|(ts, _, _)| *ts);
        let columns = selection.columns();
        let records = changed
            .into_iter()
            .map(|(_, _, row)| {
                row.iter()
                    .filter(|(k, _)| columns.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect();

        Ok(Extraction {
            records,
            watermark_candidate,
        })
    }

    async fn ensure_schema(&self, _selection: &FieldSelection) -> Result<()> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn transform_for_load(
        &self,
        records: &[MovieRecord],
        selection: &FieldSelection,
    ) -> Result<LoadBatch> {
        records
            .iter()
            .map(|record| to_row(record, selection))
            .collect::<Result<Vec<_>>>()
            .map(LoadBatch::Rows)
    }

    async fn load(&self, batch: LoadBatch, selection: &FieldSelection) -> Result<LoadAck> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let LoadBatch::Rows(rows) = batch else {
            return Err(ReelError::Load("memory backend expects rows".to_string()));
        };
        let fail_after = self.fail_after.lock().unwrap().take();
        let columns = selection.columns();

        let mut stored = self.rows.lock().unwrap();
        for (written, row) in rows.iter().enumerate() {
            if fail_after == Some(written) {
                return Err(ReelError::Load(format!(
                    "connection lost after {written} rows"
                )));
            }
            let record: RawRecord = columns
                .iter()
                .zip(row)
                .map(|(col, value)| {
                    let value = value.clone().map_or(Value::Null, Value::String);
                    ((*col).to_string(), value)
                })
                .collect();
            let id = record[Field::FilmId.column()]
                .as_str()
                .unwrap_or_default()
                .to_string();
            stored
                .entry(id)
                .and_modify(|existing| existing.extend(record.clone()))
                .or_insert(record);
        }
        Ok(LoadAck { loaded: rows.len() })
    }
}

/// Source record in the aggregated relational shape
pub fn film(id: &str, title: &str, updated_at: &str) -> RawRecord {
    json!({
        "id": id,
        "title": title,
        "rating": 7.1,
        "type": "movie",
        "updated_at": updated_at,
        "genre": [{"id": "1", "name": "Drama"}],
        "actors": [
            {"id": format!("{id}-a1"), "full_name": "First Actor"},
            {"id": format!("{id}-a2"), "full_name": "Second Actor"}
        ],
        "writers": [],
        "directors": null
    })
    .as_object()
    .cloned()
    .unwrap()
}

/// `count` films with strictly increasing `updated_at`, one second apart
pub fn films(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|i| {
            film(
                &format!("film-{i:02}"),
                &format!("Film {i}"),
                &format!("2024-03-01 12:00:{i:02}"),
            )
        })
        .collect()
}

pub const FIELDS: &[&str] = &[
    "film_id",
    "title",
    "rating",
    "film_type",
    "updated_at",
    "genre",
    "actors",
    "writers",
    "directors",
];

pub fn selection(source: BackendKind, destination: BackendKind) -> FieldSelection {
    FieldCatalog::movies()
        .resolve(FIELDS, source, destination)
        .unwrap()
}

pub fn ts(value: &str) -> SyncTimestamp {
    SyncTimestamp::parse(value).unwrap()
}

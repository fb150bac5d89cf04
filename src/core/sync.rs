//! Sync coordinator - one chunked run from source to destination
//!
//! A run reads the committed watermark, extracts at most one chunk of changed
//! records, reshapes them for the destination, provisions the destination,
//! loads the batch and only then commits the new watermark. Any failure after
//! the watermark read leaves the marker where it was, so the next run
//! re-extracts an overlapping window and upserts absorb the repeats.

use crate::adapters::backend::{create_backend, MovieBackend};
use crate::catalog::FieldSelection;
use crate::config::ReelConfig;
use crate::core::dispatch::{Branch, Role, RunPlan, Step};
use crate::core::state::{JsonFileStorage, WatermarkStore};
use crate::core::transform::{prepare_for_destination, to_canonical_batch, GenreLookup};
use crate::domain::{BackendKind, ReelError, Result, SyncTimestamp};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-run knobs that do not depend on the backends
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub chunk_size: usize,
    pub selection: FieldSelection,
    pub dry_run: bool,
    pub genres: GenreLookup,
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    pub source: BackendKind,
    pub destination: BackendKind,

    /// Records returned by the source
    pub extracted: usize,

    /// Records acknowledged by the destination
    pub loaded: usize,

    pub watermark_before: SyncTimestamp,
    pub watermark_after: SyncTimestamp,

    /// Whether the durable marker moved
    pub committed: bool,

    pub dry_run: bool,
    pub duration: Duration,
}

impl SyncSummary {
    fn new(source: BackendKind, destination: BackendKind, before: SyncTimestamp, dry_run: bool) -> Self {
        Self {
            source,
            destination,
            extracted: 0,
            loaded: 0,
            watermark_before: before,
            watermark_after: before,
            committed: false,
            dry_run,
            duration: Duration::from_secs(0),
        }
    }

    /// Nothing changed since the last run
    pub fn is_empty(&self) -> bool {
        self.extracted == 0
    }

    /// Log the summary
    pub fn log(&self) {
        tracing::info!(
            source = %self.source,
            destination = %self.destination,
            extracted = self.extracted,
            loaded = self.loaded,
            watermark_before = %self.watermark_before,
            watermark_after = %self.watermark_after,
            committed = self.committed,
            dry_run = self.dry_run,
            duration_ms = self.duration.as_millis() as u64,
            "Sync run finished"
        );
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sync {} -> {}", self.source, self.destination)?;
        if self.dry_run {
            writeln!(f, "  mode:       dry run (nothing written)")?;
        }
        writeln!(f, "  extracted:  {}", self.extracted)?;
        writeln!(f, "  loaded:     {}", self.loaded)?;
        writeln!(f, "  watermark:  {} -> {}", self.watermark_before, self.watermark_after)?;
        writeln!(f, "  committed:  {}", self.committed)?;
        write!(f, "  duration:   {:.2}s", self.duration.as_secs_f64())
    }
}

/// Sync coordinator
pub struct SyncCoordinator {
    source: Arc<dyn MovieBackend + Send + Sync>,
    destination: Arc<dyn MovieBackend + Send + Sync>,
    store: WatermarkStore,
    settings: SyncSettings,
    source_branch: Branch,
    destination_branch: Branch,
}

impl SyncCoordinator {
    /// Create a coordinator over already-built backends
    pub fn new(
        source: Arc<dyn MovieBackend + Send + Sync>,
        destination: Arc<dyn MovieBackend + Send + Sync>,
        store: WatermarkStore,
        settings: SyncSettings,
    ) -> Self {
        let source_branch = Branch::source(source.kind());
        let destination_branch = Branch::destination(destination.kind());
        Self {
            source,
            destination,
            store,
            settings,
            source_branch,
            destination_branch,
        }
    }

    /// Build backends, state store and settings from configuration
    ///
    /// Selection and kinds are resolved before any backend is created.
    ///
    /// # Errors
    ///
    /// Returns a configuration or mapping error for an invalid plan, or a
    /// client construction error.
    pub async fn from_config(config: &ReelConfig) -> Result<Self> {
        let plan = RunPlan::from_config(config)?;

        let source = create_backend(&config.source).await?;
        let destination = create_backend(&config.destination).await?;

        let storage = Arc::new(JsonFileStorage::new(&config.state.path));
        let store = WatermarkStore::new(storage, config.state.key.clone());

        let settings = SyncSettings {
            chunk_size: plan.chunk_size,
            selection: plan.selection,
            dry_run: config.application.dry_run,
            genres: GenreLookup::from_config(&config.sync.genres),
        };

        tracing::info!(
            source = %source.describe(),
            destination = %destination.describe(),
            state_key = %store.key(),
            "Sync coordinator ready"
        );

        Ok(Self::new(source, destination, store, settings))
    }

    pub fn store(&self) -> &WatermarkStore {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    fn enter(&self, role: Role, step: Step) {
        let branch = match role {
            Role::Source => &self.source_branch,
            Role::Destination => &self.destination_branch,
        };
        tracing::debug!(branch = %role, kind = %branch.kind, step = %step, "Entering step");
    }

    /// Record the failure unless this is a dry run, then hand the error back
    async fn fail<T>(&self, err: ReelError) -> Result<T> {
        tracing::error!(error = %err, "Sync run failed; watermark left unchanged");
        if !self.settings.dry_run {
            if let Err(state_err) = self.store.mark_failed().await {
                tracing::warn!(error = %state_err, "Could not record failed run status");
            }
        }
        Err(err)
    }

    /// Run one chunk end to end
    ///
    /// # Errors
    ///
    /// Returns the first extraction, transform, provisioning, load or state
    /// error. The watermark is committed only when every step succeeded.
    pub async fn run_once(&self) -> Result<SyncSummary> {
        let start = Instant::now();
        let dry_run = self.settings.dry_run;
        let selection = &self.settings.selection;

        let before = self.store.get().await?;
        let mut summary = SyncSummary::new(
            self.source.kind(),
            self.destination.kind(),
            before,
            dry_run,
        );

        tracing::info!(
            source = %self.source_branch,
            destination = %self.destination_branch,
            watermark = %before,
            chunk_size = self.settings.chunk_size,
            dry_run,
            "Starting sync run"
        );

        if !dry_run {
            self.store.mark_started().await?;
        }

        for step in self.source_branch.steps {
            self.enter(Role::Source, *step);
        }
        let extraction = match self
            .source
            .extract(before, self.settings.chunk_size, selection)
            .await
        {
            Ok(extraction) => extraction,
            Err(e) => return self.fail(e).await,
        };
        summary.extracted = extraction.len();

        if extraction.is_empty() {
            tracing::info!(watermark = %before, "No changed records since watermark");
            if !dry_run {
                self.store.mark_completed().await?;
            }
            summary.duration = start.elapsed();
            return Ok(summary);
        }

        self.enter(Role::Destination, Step::Preprocess);
        let batch = match to_canonical_batch(&extraction.records, selection)
            .map(|records| {
                prepare_for_destination(records, self.destination.kind(), &self.settings.genres)
            })
            .and_then(|records| self.destination.transform_for_load(&records, selection))
        {
            Ok(batch) => batch,
            Err(e) => return self.fail(e).await,
        };

        if dry_run {
            tracing::info!(
                records = batch.len(),
                candidate = ?extraction.watermark_candidate.map(|t| t.to_string()),
                "Dry run: skipping schema, load and commit"
            );
            if let Some(candidate) = extraction.watermark_candidate {
                summary.watermark_after = candidate;
            }
            summary.duration = start.elapsed();
            return Ok(summary);
        }

        self.enter(Role::Destination, Step::EnsureSchema);
        if let Err(e) = self.destination.ensure_schema(selection).await {
            return self.fail(e).await;
        }

        self.enter(Role::Destination, Step::Write);
        let ack = match self.destination.load(batch, selection).await {
            Ok(ack) => ack,
            Err(e) => return self.fail(e).await,
        };
        summary.loaded = ack.loaded;

        match extraction.watermark_candidate {
            Some(candidate) => {
                summary.committed = self.store.commit(candidate, ack.loaded).await?;
                summary.watermark_after = self.store.get().await?;
            }
            None => {
                tracing::warn!("Extracted records carry no updated_at; watermark not moved");
                self.store.mark_completed().await?;
            }
        }

        summary.duration = start.elapsed();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::backend::{Extraction, LoadAck, LoadBatch};
    use crate::catalog::FieldCatalog;
    use crate::core::state::{MemoryStorage, RunStatus};
    use crate::domain::MovieRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource(Extraction);

    #[async_trait]
    impl MovieBackend for FixedSource {
        fn kind(&self) -> BackendKind {
            BackendKind::Sqlite
        }
        fn describe(&self) -> String {
            "fixed".to_string()
        }
        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
        async fn extract(&self, _: SyncTimestamp, _: usize, _: &FieldSelection) -> Result<Extraction> {
            Ok(self.0.clone())
        }
        async fn ensure_schema(&self, _: &FieldSelection) -> Result<()> {
            Ok(())
        }
        fn transform_for_load(&self, _: &[MovieRecord], _: &FieldSelection) -> Result<LoadBatch> {
            Ok(LoadBatch::Rows(Vec::new()))
        }
        async fn load(&self, _: LoadBatch, _: &FieldSelection) -> Result<LoadAck> {
            Ok(LoadAck { loaded: 0 })
        }
    }

    #[derive(Default)]
    struct CountingSink {
        schema_calls: AtomicUsize,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl MovieBackend for CountingSink {
        fn kind(&self) -> BackendKind {
            BackendKind::Elasticsearch
        }
        fn describe(&self) -> String {
            "sink".to_string()
        }
        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
        async fn extract(&self, _: SyncTimestamp, _: usize, _: &FieldSelection) -> Result<Extraction> {
            Ok(Extraction::empty())
        }
        async fn ensure_schema(&self, _: &FieldSelection) -> Result<()> {
            self.schema_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn transform_for_load(&self, records: &[MovieRecord], sel: &FieldSelection) -> Result<LoadBatch> {
            Ok(LoadBatch::Documents(
                records
                    .iter()
                    .map(|r| (r.film_id.clone(), crate::core::transform::to_document(r, sel)))
                    .collect(),
            ))
        }
        async fn load(&self, batch: LoadBatch, _: &FieldSelection) -> Result<LoadAck> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(LoadAck { loaded: batch.len() })
        }
    }

    fn selection() -> FieldSelection {
        FieldCatalog::movies()
            .resolve(
                &["film_id", "title", "genre", "updated_at"],
                BackendKind::Sqlite,
                BackendKind::Elasticsearch,
            )
            .unwrap()
    }

    fn settings(dry_run: bool) -> SyncSettings {
        SyncSettings {
            chunk_size: 10,
            selection: selection(),
            dry_run,
            genres: GenreLookup::default(),
        }
    }

    fn extraction() -> Extraction {
        let records = vec![
            json!({"id": "f1", "title": "A", "genre": "[\"Drama\"]", "updated_at": "2024-01-01 00:00:00"}),
            json!({"id": "f2", "title": "B", "genre": "[]", "updated_at": "2024-01-02 00:00:00"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
        Extraction {
            records,
            watermark_candidate: Some(SyncTimestamp::parse("2024-01-02 00:00:00").unwrap()),
        }
    }

    fn store() -> WatermarkStore {
        WatermarkStore::new(Arc::new(MemoryStorage::new()), "movies_updated_state")
    }

    #[tokio::test]
    async fn test_run_commits_after_load() {
        let sink = Arc::new(CountingSink::default());
        let coordinator = SyncCoordinator::new(
            Arc::new(FixedSource(extraction())),
            sink.clone(),
            store(),
            settings(false),
        );

        let summary = coordinator.run_once().await.unwrap();
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.loaded, 2);
        assert!(summary.committed);
        assert_eq!(summary.watermark_after.to_string(), "2024-01-02 00:00:00");
        assert_eq!(sink.schema_calls.load(Ordering::SeqCst), 1);

        let state = coordinator.store().current().await.unwrap();
        assert_eq!(state.last_run_status, RunStatus::Completed);
        assert_eq!(state.records_synced_count, 2);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let sink = Arc::new(CountingSink::default());
        let coordinator = SyncCoordinator::new(
            Arc::new(FixedSource(extraction())),
            sink.clone(),
            store(),
            settings(true),
        );

        let summary = coordinator.run_once().await.unwrap();
        assert!(summary.dry_run);
        assert!(!summary.committed);
        assert_eq!(summary.loaded, 0);
        assert_eq!(sink.schema_calls.load(Ordering::SeqCst), 0);
        assert_eq!(sink.loads.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.store().get().await.unwrap(), SyncTimestamp::min());
        assert_eq!(
            coordinator.store().current().await.unwrap().last_run_status,
            RunStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn test_empty_extraction_skips_destination() {
        let sink = Arc::new(CountingSink::default());
        let coordinator = SyncCoordinator::new(
            Arc::new(FixedSource(Extraction::empty())),
            sink.clone(),
            store(),
            settings(false),
        );

        let summary = coordinator.run_once().await.unwrap();
        assert!(summary.is_empty());
        assert!(!summary.committed);
        assert_eq!(sink.schema_calls.load(Ordering::SeqCst), 0);
        assert!(summary.to_string().contains("extracted:  0"));
    }
}

//! PostgreSQL adapter implementing [`MovieBackend`]

use crate::adapters::backend::{Extraction, LoadAck, LoadBatch, MovieBackend, RawRecord};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::sql;
use crate::catalog::{FieldCatalog, FieldSelection};
use crate::core::transform::to_row;
use crate::domain::{BackendKind, MovieRecord, ReelError, Result, SyncTimestamp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;

/// PostgreSQL implementation of [`MovieBackend`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    catalog: FieldCatalog,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self::new_with_arc(Arc::new(client))
    }

    /// Create a new PostgreSQL adapter with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self {
            client,
            catalog: FieldCatalog::movies(),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

fn already_exists(err: &tokio_postgres::Error) -> bool {
    matches!(
        err.code(),
        Some(code) if *code == SqlState::DUPLICATE_SCHEMA
            || *code == SqlState::DUPLICATE_TABLE
            || *code == SqlState::UNIQUE_VIOLATION
    )
}

#[async_trait]
impl MovieBackend for PostgreSQLAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn describe(&self) -> String {
        format!(
            "{} ({}.{})",
            self.client.connection_string_safe(),
            self.client.schema(),
            self.client.table()
        )
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn extract(
        &self,
        watermark: SyncTimestamp,
        chunk_size: usize,
        selection: &FieldSelection,
    ) -> Result<Extraction> {
        let (schema, table) = (self.client.schema(), self.client.table());
        let limit = i64::try_from(chunk_size)
            .map_err(|_| ReelError::Configuration(format!("chunk_size {chunk_size} too large")))?;

        let changed = self
            .client
            .query(
                &sql::changed_ids_query(schema, table),
                &[&watermark.to_string(), &limit],
            )
            .await?;

        if changed.is_empty() {
            tracing::debug!(watermark = %watermark, "No changed films in PostgreSQL");
            return Ok(Extraction::empty());
        }

        let mut ids = Vec::with_capacity(changed.len());
        let mut last_updated = None;
        for row in &changed {
            let id: String = row
                .try_get("id")
                .map_err(|e| ReelError::Extraction(format!("Unreadable film id: {e}")))?;
            let updated: String = row
                .try_get("updated_at")
                .map_err(|e| ReelError::Extraction(format!("Unreadable updated_at: {e}")))?;
            ids.push(id);
            last_updated = Some(updated);
        }

        let films = self
            .client
            .query(
                &sql::film_data_query(schema, table, &self.catalog, selection)?,
                &[&ids],
            )
            .await?;

        let mut by_id: HashMap<String, RawRecord> = HashMap::with_capacity(films.len());
        for row in films {
            let text: String = row
                .try_get("film")
                .map_err(|e| ReelError::Extraction(format!("Unreadable film row: {e}")))?;
            let record: RawRecord = serde_json::from_str(&text)?;
            let id = record
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    ReelError::Extraction("Aggregated film row has no id".to_string())
                })?;
            by_id.insert(id, record);
        }

        // phase-1 order is the updated_at order
        let records: Vec<RawRecord> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        if records.len() != ids.len() {
            tracing::warn!(
                expected = ids.len(),
                fetched = records.len(),
                "Some changed films disappeared between extraction phases"
            );
        }

        let watermark_candidate = last_updated
            .map(|ts| SyncTimestamp::parse(&ts).map_err(ReelError::Extraction))
            .transpose()?;

        tracing::info!(
            count = records.len(),
            watermark = %watermark,
            "Extracted changed films from PostgreSQL"
        );

        Ok(Extraction {
            records,
            watermark_candidate,
        })
    }

    async fn ensure_schema(&self, selection: &FieldSelection) -> Result<()> {
        let (schema, table) = (self.client.schema(), self.client.table());
        let statements = [
            sql::create_schema_sql(schema),
            sql::create_table_sql(schema, table, &self.catalog, selection)?,
        ];

        let conn = self
            .client
            .get_connection()
            .await
            .map_err(|e| ReelError::Provisioning(e.to_string()))?;

        for statement in &statements {
            match conn.batch_execute(statement).await {
                Ok(()) => {}
                Err(e) if already_exists(&e) => {
                    tracing::info!(statement = %statement, "Already exists, continuing");
                }
                Err(e) => {
                    return Err(ReelError::Provisioning(format!(
                        "Failed to create {schema}.{table}: {e}"
                    )))
                }
            }
        }

        tracing::info!(schema = %schema, table = %table, "PostgreSQL table ready");
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
        let LoadBatch::Rows(rows) = batch else {
            return Err(ReelError::Load(
                "PostgreSQL loads expect flat rows".to_string(),
            ));
        };
        if rows.is_empty() {
            return Ok(LoadAck { loaded: 0 });
        }

        let (schema, table) = (self.client.schema(), self.client.table());
        let per_statement = sql::rows_per_statement(selection.len());

        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(|e| ReelError::Load(e.to_string()))?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| ReelError::Load(format!("Failed to open transaction: {e}")))?;

        for chunk in rows.chunks(per_statement) {
            let statement = sql::upsert_sql(schema, table, &self.catalog, selection, chunk.len())?;
            let params: Vec<&(dyn ToSql + Sync)> = chunk
                .iter()
                .flatten()
                .map(|value| value as &(dyn ToSql + Sync))
                .collect();

            tx.execute(statement.as_str(), &params)
                .await
                .map_err(|e| ReelError::Load(format!("Upsert into {schema}.{table} failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| ReelError::Load(format!("Commit failed: {e}")))?;

        tracing::info!(
            loaded = rows.len(),
            schema = %schema,
            table = %table,
            "Upserted films into PostgreSQL"
        );

        Ok(LoadAck { loaded: rows.len() })
    }
}

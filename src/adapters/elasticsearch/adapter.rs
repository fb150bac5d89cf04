//! Elasticsearch adapter implementing [`MovieBackend`]

use crate::adapters::backend::{Extraction, LoadAck, LoadBatch, MovieBackend, RawRecord};
use crate::adapters::elasticsearch::client::ElasticsearchClient;
use crate::adapters::elasticsearch::models;
use crate::catalog::{Field, FieldCatalog, FieldSelection};
use crate::core::transform::to_document;
use crate::domain::{BackendKind, MovieRecord, ReelError, Result, SyncTimestamp};
use async_trait::async_trait;
use serde_json::Value;

/// Elasticsearch implementation of [`MovieBackend`]
///
/// One index holds one document per film, `_id` = film id.
pub struct ElasticsearchAdapter {
    client: ElasticsearchClient,
    catalog: FieldCatalog,
}

impl ElasticsearchAdapter {
    pub fn new(client: ElasticsearchClient) -> Self {
        Self {
            client,
            catalog: FieldCatalog::movies(),
        }
    }

    pub fn client(&self) -> &ElasticsearchClient {
        &self.client
    }
}

#[async_trait]
impl MovieBackend for ElasticsearchAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Elasticsearch
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.client.base_url(), self.client.index())
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.ping().await
    }

    async fn extract(
        &self,
        watermark: SyncTimestamp,
        chunk_size: usize,
        selection: &FieldSelection,
    ) -> Result<Extraction> {
        let body = models::search_body(watermark, chunk_size, selection);
        let response = self.client.search(&body).await?;

        let mut records = Vec::with_capacity(response.hits.hits.len());
        let mut last_updated = None;
        for hit in response.hits.hits {
            let mut record: RawRecord = hit.source;
            let id_key = Field::FilmId.column();
            if record.get(id_key).map_or(true, Value::is_null) {
                record.insert(id_key.to_string(), Value::String(hit.id));
            }
            if let Some(updated) = record.get(Field::UpdatedAt.column()).and_then(Value::as_str) {
                last_updated = Some(updated.to_string());
            }
            records.push(record);
        }

        let watermark_candidate = last_updated
            .map(|ts| SyncTimestamp::parse(&ts).map_err(ReelError::Extraction))
            .transpose()?;

        tracing::info!(
            count = records.len(),
            index = %self.client.index(),
            watermark = %watermark,
            "Extracted changed documents from Elasticsearch"
        );

        Ok(Extraction {
            records,
            watermark_candidate,
        })
    }

    async fn ensure_schema(&self, selection: &FieldSelection) -> Result<()> {
        let body = models::index_body(&self.catalog, selection)?;
        if self.client.create_index(&body).await? {
            tracing::info!(index = %self.client.index(), "Index created, acknowledged");
        } else {
            tracing::info!(index = %self.client.index(), "Index already exists, continuing");
        }
        Ok(())
    }

    fn transform_for_load(
        &self,
        records: &[MovieRecord],
        selection: &FieldSelection,
    ) -> Result<LoadBatch> {
        Ok(LoadBatch::Documents(
            records
                .iter()
                .map(|record| (record.film_id.clone(), to_document(record, selection)))
                .collect(),
        ))
    }

    async fn load(&self, batch: LoadBatch, _selection: &FieldSelection) -> Result<LoadAck> {
        let LoadBatch::Documents(documents) = batch else {
            return Err(ReelError::Load(
                "Elasticsearch loads expect documents".to_string(),
            ));
        };
        if documents.is_empty() {
            return Ok(LoadAck { loaded: 0 });
        }

        let payload = models::bulk_payload(self.client.index(), &documents)?;
        let response = self.client.bulk(payload).await?;

        let failures = response.failures();
        if response.errors || !failures.is_empty() {
            for (id, reason) in failures.iter().take(10) {
                tracing::error!(film_id = %id, reason = %reason, "Bulk item rejected");
            }
            return Err(ReelError::Load(format!(
                "{} of {} documents rejected by index '{}'",
                failures.len(),
                documents.len(),
                self.client.index()
            )));
        }

        tracing::info!(
            loaded = documents.len(),
            index = %self.client.index(),
            "Indexed films into Elasticsearch"
        );

        Ok(LoadAck {
            loaded: documents.len(),
        })
    }
}

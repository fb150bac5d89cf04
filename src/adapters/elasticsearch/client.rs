//! Elasticsearch REST client

use crate::adapters::elasticsearch::models::{error_type, BulkResponse, SearchResponse};
use crate::config::schema::ElasticsearchConfig;
use crate::domain::{ReelError, Result};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;

/// Thin REST client bound to one index
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
    config: ElasticsearchConfig,
}

impl ElasticsearchClient {
    /// Build the HTTP client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)))
            .build()
            .map_err(|e| ReelError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn index(&self) -> &str {
        &self.config.index
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.username, &self.config.password) {
            (Some(username), Some(password)) => {
                request.basic_auth(username, Some(password.expose_secret().as_str()))
            }
            (Some(username), None) => request.basic_auth(username, None::<&str>),
            _ => request,
        }
    }

    /// GET the cluster root
    pub async fn ping(&self) -> Result<()> {
        let resp = self
            .with_auth(self.client.get(&self.base_url))
            .send()
            .await
            .map_err(|e| ReelError::Search(format!("Failed to reach {}: {e}", self.base_url)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ReelError::Search(format!(
                "Ping failed with status {status}: {body}"
            )));
        }

        tracing::info!(url = %self.base_url, "Elasticsearch connection test successful");
        Ok(())
    }

    /// PUT the index; `Ok(false)` when it already exists
    pub async fn create_index(&self, body: &Value) -> Result<bool> {
        let url = format!("{}/{}", self.base_url, self.config.index);
        let resp = self
            .with_auth(self.client.put(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| ReelError::Provisioning(format!("Index request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(true);
        }

        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST {
            let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            if error_type(&parsed) == Some("resource_already_exists_exception") {
                return Ok(false);
            }
        }

        Err(ReelError::Provisioning(format!(
            "Failed to create index '{}' ({status}): {text}",
            self.config.index
        )))
    }

    /// POST a query to `_search` on the configured index
    pub async fn search(&self, body: &Value) -> Result<SearchResponse> {
        let url = format!("{}/{}/_search", self.base_url, self.config.index);
        let resp = self
            .with_auth(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| ReelError::Extraction(format!("Search request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ReelError::Extraction(format!(
                "Search on '{}' failed with status {status}: {body}",
                self.config.index
            )));
        }

        resp.json::<SearchResponse>()
            .await
            .map_err(|e| ReelError::Extraction(format!("Malformed search response: {e}")))
    }

    /// POST an NDJSON payload to `_bulk`
    pub async fn bulk(&self, payload: String) -> Result<BulkResponse> {
        let mut url = format!("{}/_bulk", self.base_url);
        if self.config.refresh {
            url.push_str("?refresh=true");
        }

        let resp = self
            .with_auth(self.client.post(&url))
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await
            .map_err(|e| ReelError::Load(format!("Bulk request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ReelError::Load(format!(
                "Bulk request failed with status {status}: {body}"
            )));
        }

        resp.json::<BulkResponse>()
            .await
            .map_err(|e| ReelError::Load(format!("Malformed bulk response: {e}")))
    }
}

//! Backend registry
//!
//! Maps each [`BackendKind`] to its adapter. The match is exhaustive, so a
//! new kind cannot be added without an adapter.

use crate::adapters::backend::traits::MovieBackend;
use crate::adapters::elasticsearch::{ElasticsearchAdapter, ElasticsearchClient};
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::adapters::sqlite::SqliteAdapter;
use crate::config::schema::ConnectionConfig;
use crate::domain::{BackendKind, ReelError, Result};
use std::sync::Arc;

fn missing(kind: BackendKind) -> ReelError {
    ReelError::Configuration(format!(
        "Connection of kind '{kind}' has no [{}] settings",
        match kind {
            BackendKind::Postgres => "postgresql",
            BackendKind::Elasticsearch => "elasticsearch",
            BackendKind::Sqlite => "sqlite",
        }
    ))
}

/// Create the adapter for one side of a run
///
/// No I/O happens here apart from building connection pools lazily.
///
/// # Errors
///
/// Returns a configuration error if the sub-table for `config.kind` is
/// absent or cannot be turned into a client.
pub async fn create_backend(
    config: &ConnectionConfig,
) -> Result<Arc<dyn MovieBackend + Send + Sync>> {
    match config.kind {
        BackendKind::Postgres => {
            let pg_config = config
                .postgresql
                .as_ref()
                .ok_or_else(|| missing(config.kind))?;

            tracing::info!("Creating PostgreSQL backend");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;

            Ok(Arc::new(PostgreSQLAdapter::new(client)) as Arc<dyn MovieBackend + Send + Sync>)
        }
        BackendKind::Elasticsearch => {
            let es_config = config
                .elasticsearch
                .as_ref()
                .ok_or_else(|| missing(config.kind))?;

            tracing::info!("Creating Elasticsearch backend");
            let client = ElasticsearchClient::new(es_config.clone())?;

            Ok(Arc::new(ElasticsearchAdapter::new(client)) as Arc<dyn MovieBackend + Send + Sync>)
        }
        BackendKind::Sqlite => {
            let sqlite_config = config
                .sqlite
                .as_ref()
                .ok_or_else(|| missing(config.kind))?;

            tracing::info!("Creating SQLite backend");
            Ok(Arc::new(SqliteAdapter::new(sqlite_config)) as Arc<dyn MovieBackend + Send + Sync>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SqliteConfig;

    #[tokio::test]
    async fn test_creates_adapter_for_kind() {
        let config = ConnectionConfig {
            kind: BackendKind::Sqlite,
            postgresql: None,
            elasticsearch: None,
            sqlite: Some(SqliteConfig {
                path: "movies.db".to_string(),
                table: "film_work".to_string(),
            }),
        };
        let backend = create_backend(&config).await.unwrap();
        assert_eq!(backend.kind(), BackendKind::Sqlite);
        assert!(backend.describe().contains("movies.db"));
    }

    #[tokio::test]
    async fn test_missing_settings_is_configuration_error() {
        let config = ConnectionConfig {
            kind: BackendKind::Elasticsearch,
            postgresql: None,
            elasticsearch: None,
            sqlite: None,
        };
        let err = create_backend(&config).await.err().unwrap();
        assert!(matches!(err, ReelError::Configuration(_)));
    }
}

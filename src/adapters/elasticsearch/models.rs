//! Elasticsearch request and response bodies

use crate::catalog::{FieldCatalog, FieldSelection};
use crate::domain::{FilmId, ReelError, Result, SyncTimestamp};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Index creation body: `ru_en` analysis plus strict mappings for `selection`
///
/// # Errors
///
/// Returns a mapping error if a selected field has no search mapping.
pub fn index_body(catalog: &FieldCatalog, selection: &FieldSelection) -> Result<Value> {
    let mut properties = Map::new();
    for field in selection.fields() {
        let mapping = catalog.require(*field)?.search.clone().ok_or_else(|| {
            ReelError::Mapping(format!("Field '{field}' has no Elasticsearch mapping"))
        })?;
        properties.insert(field.column().to_string(), mapping);
    }

    Ok(json!({
        "settings": {
            "refresh_interval": "1s",
            "analysis": {
                "filter": {
                    "english_stop": {"type": "stop", "stopwords": "_english_"},
                    "english_stemmer": {"type": "stemmer", "language": "english"},
                    "english_possessive_stemmer": {
                        "type": "stemmer",
                        "language": "possessive_english"
                    },
                    "russian_stop": {"type": "stop", "stopwords": "_russian_"},
                    "russian_stemmer": {"type": "stemmer", "language": "russian"}
                },
                "analyzer": {
                    "ru_en": {
                        "tokenizer": "standard",
                        "filter": [
                            "lowercase",
                            "english_stop",
                            "english_stemmer",
                            "english_possessive_stemmer",
                            "russian_stop",
                            "russian_stemmer"
                        ]
                    }
                }
            }
        },
        "mappings": {
            "dynamic": "strict",
            "properties": properties
        }
    }))
}

/// Range query for documents changed since `watermark`, oldest first
pub fn search_body(watermark: SyncTimestamp, chunk_size: usize, selection: &FieldSelection) -> Value {
    let mut source = selection.columns();
    if !source.contains(&"updated_at") {
        source.push("updated_at");
    }
    json!({
        "size": chunk_size,
        "query": {"range": {"updated_at": {"gte": watermark.to_string()}}},
        "sort": [{"updated_at": {"order": "asc"}}],
        "_source": source
    })
}

/// NDJSON bulk payload of `index` actions keyed by film id
pub fn bulk_payload(index: &str, documents: &[(FilmId, Value)]) -> Result<String> {
    let mut payload = String::new();
    for (id, doc) in documents {
        let action = json!({"index": {"_index": index, "_id": id.as_str()}});
        payload.push_str(&serde_json::to_string(&action)?);
        payload.push('\n');
        payload.push_str(&serde_json::to_string(doc)?);
        payload.push('\n');
    }
    Ok(payload)
}

/// `_search` response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
}

/// `_bulk` response
#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,

    #[serde(default)]
    pub items: Vec<Map<String, Value>>,
}

impl BulkResponse {
    /// `(id, reason)` of every failed item
    pub fn failures(&self) -> Vec<(String, String)> {
        self.items
            .iter()
            .filter_map(|item| item.values().next())
            .filter_map(|result| {
                let error = result.get("error")?;
                let id = result
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                let reason = error
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                Some((id, reason))
            })
            .collect()
    }
}

/// Error type reported by the engine in an error response body
pub fn error_type(body: &Value) -> Option<&str> {
    body.get("error")?.get("type")?.as_str()
}

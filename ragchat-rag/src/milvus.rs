//! Milvus vector store backend.
//!
//! Provides [`MilvusVectorStore`] which implements [`VectorStore`] against the
//! Milvus v2 RESTful API (`/v2/vectordb/...`), served by Milvus itself on port
//! 19530 or by Zilliz Cloud.
//!
//! Collections are created in quick-setup mode: an auto-generated `Int64`
//! primary key, a `vector` field with cosine metric, and dynamic fields for
//! `text` and `metadata`.
//!
//! This module is only available when the `milvus` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat_rag::milvus::MilvusVectorStore;
//!
//! let store = MilvusVectorStore::new("http://127.0.0.1:19530")?;
//! store.create_collection("docs", 1024).await?;
//! let results = store.search("docs", &query_embedding, 3).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::document::{NewRecord, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// The default Milvus address.
pub const DEFAULT_MILVUS_URL: &str = "http://127.0.0.1:19530";

const VECTOR_FIELD: &str = "vector";

/// A [`VectorStore`] backed by [Milvus](https://milvus.io/) over HTTP.
pub struct MilvusVectorStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    database: Option<String>,
}

impl MilvusVectorStore {
    /// Create a store talking to the Milvus server at `url`.
    pub fn new(url: &str) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RagError::ConfigError(format!(
                "Milvus URL must start with http:// or https://, got '{url}'"
            )));
        }
        Ok(Self { client: reqwest::Client::new(), base_url, token: None, database: None })
    }

    /// Create a store pointing at `http://127.0.0.1:19530`.
    pub fn default_url() -> Result<Self> {
        Self::new(DEFAULT_MILVUS_URL)
    }

    /// Authenticate with a token (`user:password` or a Zilliz API key).
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a database other than `default`.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    fn map_err(message: impl Into<String>) -> RagError {
        RagError::VectorStoreError { backend: "milvus".to_string(), message: message.into() }
    }

    /// POST a request body and unwrap the `{code, message, data}` envelope.
    async fn post<T: DeserializeOwned + Default>(&self, path: &str, mut body: Value) -> Result<T> {
        if let (Some(db), Some(obj)) = (&self.database, body.as_object_mut()) {
            obj.insert("dbName".to_string(), Value::String(db.clone()));
        }

        let mut request = self.client.post(format!("{}{path}", self.base_url)).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(backend = "milvus", path, error = %e, "request failed");
            Self::map_err(format!("request to {path} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(backend = "milvus", path, %status, "HTTP error");
            return Err(Self::map_err(format!("{path} returned {status}: {body}")));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Self::map_err(format!("failed to parse {path} response: {e}"))
        })?;

        if envelope.code != 0 {
            let message = envelope.message.unwrap_or_default();
            error!(backend = "milvus", path, code = envelope.code, %message, "API error");
            return Err(Self::map_err(format!("{path} failed with code {}: {message}", envelope.code)));
        }

        Ok(envelope.data.unwrap_or_default())
    }
}

// ── Milvus REST response types ─────────────────────────────────────

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Deserialize, Default)]
struct HasData {
    has: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct InsertData {
    #[serde(default)]
    insert_ids: Vec<Value>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Value,
    distance: f32,
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorStore for MilvusVectorStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        let data: HasData =
            self.post("/v2/vectordb/collections/has", json!({ "collectionName": name })).await?;
        Ok(data.has)
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.post::<Value>(
            "/v2/vectordb/collections/create",
            json!({
                "collectionName": name,
                "dimension": dimensions,
                "metricType": "COSINE",
                "primaryFieldName": "id",
                "idType": "Int64",
                "autoID": true,
                "vectorFieldName": VECTOR_FIELD,
            }),
        )
        .await?;
        debug!(collection = name, dimensions, "created milvus collection");
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.post::<Value>("/v2/vectordb/collections/drop", json!({ "collectionName": name }))
            .await?;
        debug!(collection = name, "dropped milvus collection");
        Ok(())
    }

    async fn add_record(&self, collection: &str, record: NewRecord) -> Result<String> {
        let data: InsertData = self
            .post(
                "/v2/vectordb/entities/insert",
                json!({
                    "collectionName": collection,
                    "data": [{
                        VECTOR_FIELD: record.embedding,
                        "text": record.text,
                        "metadata": record.metadata,
                    }],
                }),
            )
            .await?;

        data.insert_ids
            .first()
            .map(id_to_string)
            .ok_or_else(|| Self::map_err("insert returned no id"))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let rows: Vec<HashMap<String, Value>> = self
            .post(
                "/v2/vectordb/entities/query",
                json!({
                    "collectionName": collection,
                    "filter": "",
                    "outputFields": ["count(*)"],
                }),
            )
            .await?;

        rows.first()
            .and_then(|row| row.get("count(*)"))
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| Self::map_err("count query returned no rows"))
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let hits: Vec<SearchHit> = self
            .post(
                "/v2/vectordb/entities/search",
                json!({
                    "collectionName": collection,
                    "data": [embedding],
                    "annsField": VECTOR_FIELD,
                    "limit": top_k,
                    "outputFields": ["text", "metadata"],
                }),
            )
            .await?;

        // With the COSINE metric Milvus reports similarity as `distance`, larger is closer.
        let mut results: Vec<SearchResult> = hits
            .into_iter()
            .map(|hit| SearchResult {
                id: id_to_string(&hit.id),
                text: hit.text,
                score: hit.distance,
                metadata: hit.metadata,
            })
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        debug!(collection, result_count = results.len(), "milvus search completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(MilvusVectorStore::new("127.0.0.1:19530"), Err(RagError::ConfigError(_))));
        assert!(MilvusVectorStore::new("http://127.0.0.1:19530/").is_ok());
    }

    #[test]
    fn ids_are_stringified() {
        assert_eq!(id_to_string(&json!(449827374298_i64)), "449827374298");
        assert_eq!(id_to_string(&json!("449827374298")), "449827374298");
    }

    #[test]
    fn search_hit_parses_dynamic_fields() {
        let hit: SearchHit = serde_json::from_value(json!({
            "id": 1,
            "distance": 0.87,
            "text": "长安一片月",
            "metadata": {"chunk_index": "1"}
        }))
        .unwrap();
        assert_eq!(hit.text, "长安一片月");
        assert_eq!(hit.metadata["chunk_index"], "1");
    }

    #[test]
    fn error_envelope_parses() {
        let envelope: Envelope<Value> =
            serde_json::from_value(json!({"code": 100, "message": "collection not found"})).unwrap();
        assert_eq!(envelope.code, 100);
        assert_eq!(envelope.message.as_deref(), Some("collection not found"));
    }
}

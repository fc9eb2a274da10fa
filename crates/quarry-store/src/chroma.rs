//! REST client for a Chroma vector database.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::vector_store::{BoxFuture, Metadata, QueryResult, RecordBatch, VectorStore};

/// Vector store backed by a Chroma server over its v1 HTTP API.
///
/// Collection names resolve to server-side ids through `get_or_create`,
/// so collections spring into existence on first use. Resolved ids are
/// cached per name for the lifetime of the client.
pub struct ChromaStore {
    client: reqwest::Client,
    base_url: String,
    ids: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for ChromaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ChromaStore {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("default HTTP client construction must not fail");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ids: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await.map_err(StoreError::Http)?;
        if !status.is_success() {
            tracing::error!("chroma request to {url} failed with {status}: {text}");
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolve `name` to a collection id, creating the collection if needed.
    async fn collection_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.ids.read().await.get(name) {
            return Ok(id.clone());
        }
        let created: CollectionRecord = self
            .post(
                "/api/v1/collections",
                &CreateCollectionRequest {
                    name,
                    get_or_create: true,
                },
            )
            .await?;
        self.ids
            .write()
            .await
            .insert(name.to_string(), created.id.clone());
        Ok(created.id)
    }
}

impl VectorStore for ChromaStore {
    fn add<'a>(&'a self, collection: &'a str, batch: RecordBatch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            batch.validate()?;
            let id = self.collection_id(collection).await?;
            let _: serde_json::Value = self
                .post(&format!("/api/v1/collections/{id}/add"), &batch)
                .await?;
            Ok(())
        })
    }

    fn query<'a>(
        &'a self,
        collection: &'a str,
        embedding: &'a [f32],
        n_results: usize,
    ) -> BoxFuture<'a, Result<QueryResult>> {
        Box::pin(async move {
            let id = self.collection_id(collection).await?;
            let response: ChromaQueryResponse = self
                .post(
                    &format!("/api/v1/collections/{id}/query"),
                    &ChromaQueryRequest {
                        query_embeddings: vec![embedding.to_vec()],
                        n_results,
                        include: &["metadatas", "documents", "distances"],
                    },
                )
                .await?;
            response.into_single()
        })
    }

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            let url = format!("{}/api/v1/collections", self.base_url);
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            let text = response.text().await.map_err(StoreError::Http)?;
            if !status.is_success() {
                return Err(StoreError::Upstream {
                    status: status.as_u16(),
                    body: text,
                });
            }
            let records: Vec<CollectionRecord> = serde_json::from_str(&text)?;
            Ok(records.into_iter().map(|r| r.name).collect())
        })
    }
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    get_or_create: bool,
}

#[derive(Deserialize)]
struct CollectionRecord {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Serialize)]
struct ChromaQueryRequest<'a> {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: &'a [&'a str],
}

/// Chroma nests each column one level deep, one inner list per query
/// embedding. We always send exactly one.
#[derive(Deserialize)]
struct ChromaQueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Metadata>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<String>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl ChromaQueryResponse {
    fn into_single(self) -> Result<QueryResult> {
        fn first<T>(column: Option<Vec<Vec<T>>>) -> Vec<T> {
            column
                .and_then(|mut c| (!c.is_empty()).then(|| c.swap_remove(0)))
                .unwrap_or_default()
        }

        let ids = self.ids.into_iter().next().unwrap_or_default();
        let result = QueryResult {
            metadatas: first(self.metadatas),
            documents: first(self.documents),
            distances: first(self.distances),
            ids,
        };
        if result.metadatas.len() != result.ids.len()
            || result.documents.len() != result.ids.len()
            || result.distances.len() != result.ids.len()
        {
            return Err(StoreError::Protocol(
                "query response columns disagree in length".into(),
            ));
        }
        Ok(result)
    }
}

//! Repository-scoped view over a [`VectorStore`].
//!
//! Each repository maps to one collection. The collection name embeds a
//! digest of the full repository name next to a readable basename, so two
//! repositories sharing a basename still get distinct collections while
//! the name stays recognisable in store listings.

use std::sync::Arc;

use md5::{Digest, Md5};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::vector_store::{Metadata, QueryResult, RecordBatch, VectorStore};

/// Collection for chunks ingested without a repository name.
pub const DEFAULT_COLLECTION: &str = "code_chunks";

const HASH_PREFIX_LEN: usize = 10;

/// Derive the collection name for a repository.
#[must_use]
pub fn collection_name(repository: Option<&str>) -> String {
    let Some(repository) = repository else {
        return DEFAULT_COLLECTION.to_string();
    };
    let digest = hex::encode(Md5::digest(repository.as_bytes()));
    let basename = repository
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repository);
    format!("repo_{}_{basename}", &digest[..HASH_PREFIX_LEN])
}

/// Metadata carried alongside each indexed chunk.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    pub file: String,
    pub start_line: usize,
    pub kind: String,
    pub name: Option<String>,
}

/// One chunk ready to be written: its text, vector, and metadata.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub content: String,
    pub embedding: Vec<f32>,
    pub meta: ChunkMeta,
}

/// One retrieval result, nearest first.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub file: String,
    pub start_line: usize,
    pub kind: String,
    pub name: Option<String>,
    pub content: String,
    pub distance: f32,
}

/// Reads and writes chunks for named repositories.
pub struct RepositoryIndex {
    store: Arc<dyn VectorStore>,
}

impl RepositoryIndex {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Write chunks into the repository's collection, replacing records
    /// with matching ids. Returns the record ids written, in input order.
    ///
    /// # Errors
    ///
    /// Propagates vector store failures.
    pub async fn upsert(
        &self,
        repository: Option<&str>,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<Vec<String>> {
        let collection = collection_name(repository);
        let mut batch = RecordBatch::default();
        for chunk in chunks {
            batch
                .ids
                .push(format!("{}:{}", chunk.meta.file, chunk.meta.start_line));
            batch.embeddings.push(chunk.embedding);
            batch.metadatas.push(metadata_for(&chunk.meta));
            batch.documents.push(chunk.content);
        }
        let ids = batch.ids.clone();
        tracing::debug!(collection, records = ids.len(), "upserting chunks");
        self.store.add(&collection, batch).await?;
        Ok(ids)
    }

    /// Nearest chunks to `embedding`, ascending by distance.
    ///
    /// # Errors
    ///
    /// Propagates vector store failures.
    pub async fn search(
        &self,
        repository: Option<&str>,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let collection = collection_name(repository);
        let result = self.store.query(&collection, embedding, top_k).await?;
        Ok(hits_from(result))
    }

    /// Readable names of all ingested repositories. Collections that do
    /// not follow the repository naming scheme are reported as-is.
    ///
    /// # Errors
    ///
    /// Propagates vector store failures.
    pub async fn list_repositories(&self) -> Result<Vec<String>> {
        let collections = self.store.list_collections().await?;
        Ok(collections
            .into_iter()
            .map(|name| {
                let mut parts = name.splitn(3, '_');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("repo"), Some(_), Some(basename)) => basename.to_string(),
                    _ => name,
                }
            })
            .collect())
    }
}

fn metadata_for(meta: &ChunkMeta) -> Metadata {
    let mut map = Map::new();
    map.insert("file".into(), Value::String(meta.file.clone()));
    map.insert("start_line".into(), Value::from(meta.start_line));
    map.insert("type".into(), Value::String(meta.kind.clone()));
    if let Some(name) = &meta.name {
        map.insert("name".into(), Value::String(name.clone()));
    }
    map
}

fn hits_from(result: QueryResult) -> Vec<SearchHit> {
    result
        .metadatas
        .into_iter()
        .zip(result.documents)
        .zip(result.distances)
        .map(|((metadata, content), distance)| SearchHit {
            file: str_field(&metadata, "file"),
            start_line: line_field(&metadata),
            kind: str_field(&metadata, "type"),
            name: metadata
                .get("name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
            content,
            distance,
        })
        .collect()
}

fn str_field(metadata: &Metadata, key: &str) -> String {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `start_line` tolerates both integer and string encodings; backends
/// differ in how they round-trip numeric metadata.
fn line_field(metadata: &Metadata) -> usize {
    match metadata.get("start_line") {
        Some(Value::Number(n)) => usize::try_from(n.as_u64().unwrap_or(0)).unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

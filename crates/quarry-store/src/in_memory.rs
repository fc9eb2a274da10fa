//! Process-local vector store for tests and single-shot runs.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::vector_store::{BoxFuture, Metadata, QueryResult, RecordBatch, VectorStore};

struct StoredRecord {
    id: String,
    embedding: Vec<f32>,
    metadata: Metadata,
    document: String,
}

/// In-memory collections with brute-force cosine-distance search.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine distance in [0, 2]. A zero-norm vector is treated as orthogonal
/// to everything.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

impl VectorStore for InMemoryVectorStore {
    fn add<'a>(&'a self, collection: &'a str, batch: RecordBatch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            batch.validate()?;
            let mut collections = self.collections.write().await;
            let records = collections.entry(collection.to_string()).or_default();

            let RecordBatch {
                ids,
                embeddings,
                metadatas,
                documents,
            } = batch;
            for (((id, embedding), metadata), document) in ids
                .into_iter()
                .zip(embeddings)
                .zip(metadatas)
                .zip(documents)
            {
                records.retain(|existing| existing.id != id);
                records.push(StoredRecord {
                    id,
                    embedding,
                    metadata,
                    document,
                });
            }
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
            let mut collections = self.collections.write().await;
            let records = collections.entry(collection.to_string()).or_default();

            let mut scored: Vec<(f32, &StoredRecord)> = records
                .iter()
                .map(|record| (cosine_distance(embedding, &record.embedding), record))
                .collect();
            scored.sort_by(|a, b| a.0.total_cmp(&b.0));
            scored.truncate(n_results);

            let mut result = QueryResult::default();
            for (distance, record) in scored {
                result.ids.push(record.id.clone());
                result.metadatas.push(record.metadata.clone());
                result.documents.push(record.document.clone());
                result.distances.push(distance);
            }
            Ok(result)
        })
    }

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            let mut names: Vec<String> = collections.keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }
}

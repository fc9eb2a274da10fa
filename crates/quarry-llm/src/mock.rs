//! Deterministic in-process embedder for tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::pin::Pin;

use crate::embedding::Embedder;
use crate::error::Result;

type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Embedder producing stable pseudo-random vectors from a hash of the input,
/// so equal texts always map to equal vectors and distinct texts rarely
/// collide. `truncate_batches_to` makes `embed_sequence` return fewer vectors
/// than requested, for exercising count-mismatch handling downstream.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dim: usize,
    truncate_batches_to: Option<usize>,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            truncate_batches_to: None,
        }
    }

    /// Cap the number of vectors `embed_sequence` returns.
    #[must_use]
    pub fn truncating_batches_to(mut self, len: usize) -> Self {
        self.truncate_batches_to = Some(len);
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;
        (0..self.dim)
            .map(|_| {
                // xorshift64, mapped into [-1, 1]
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                #[allow(clippy::cast_precision_loss)]
                let unit = (state >> 11) as f32 / (1u64 << 53) as f32;
                unit.mul_add(2.0, -1.0)
            })
            .collect()
    }
}

impl Embedder for MockEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        let vector = self.vector_for(text);
        Box::pin(async move { Ok(vector) })
    }

    fn embed_sequence<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        let take = self.truncate_batches_to.unwrap_or(texts.len());
        let vectors = texts
            .iter()
            .take(take)
            .map(|text| self.vector_for(text))
            .collect();
        Box::pin(async move { Ok(vectors) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_same_vector() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed("fn main() {}").await.unwrap();
        let b = embedder.embed("fn main() {}").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn different_texts_differ() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed("alpha").await.unwrap();
        let b = embedder.embed("beta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn components_stay_bounded() {
        let embedder = MockEmbedder::new(32);
        let v = embedder.embed("bounds").await.unwrap();
        assert!(v.iter().all(|c| (-1.0..=1.0).contains(c)));
    }

    #[tokio::test]
    async fn truncated_batch_returns_fewer_vectors() {
        let embedder = MockEmbedder::new(4).truncating_batches_to(1);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vectors = embedder.embed_sequence(&texts).await.unwrap();
        assert_eq!(vectors.len(), 1);
    }
}

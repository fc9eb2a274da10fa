//! Embedding service client.
//!
//! The upstream API answers in one of two shapes: a bare `embeddings` array,
//! or an OpenAI-style `data` array of `{embedding}` records. Both are tried
//! in that fixed order; a response with neither is a protocol error.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::http::{UPSTREAM_TIMEOUT, default_client};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Prefix the embedding model expects on retrieval queries and documents.
const QUERY_PREFIX: &str = "search_query: ";

/// Maps text to a dense vector of fixed dimension.
pub trait Embedder: Send + Sync {
    /// Embed one text.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;

    /// Embed many texts, one request per text, issued and awaited strictly
    /// in input order so the result is positionally aligned with `texts`.
    fn embed_sequence<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        })
    }
}

/// HTTP client for the remote embedding service.
///
/// Every returned vector is checked against the configured dimension;
/// a vector of the wrong length is a protocol violation, not data.
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_url: String,
    model: String,
    dim: usize,
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

impl HttpEmbedder {
    #[must_use]
    pub fn new(api_url: String, model: String, dim: usize) -> Self {
        Self {
            client: default_client(UPSTREAM_TIMEOUT),
            api_url,
            model,
            dim,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Embed many texts in one request using the service's list-input
    /// shape. Vectors come back positionally aligned with `texts`.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success status, a response with
    /// neither recognised shape, or vectors of the wrong dimension.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let input = EmbeddingInput::Batch(
            texts
                .iter()
                .map(|text| format!("{QUERY_PREFIX}{text}"))
                .collect(),
        );
        let vectors = self.send(input).await?.into_many()?;
        for vector in &vectors {
            self.check_dim(vector)?;
        }
        Ok(vectors)
    }

    fn check_dim(&self, vector: &[f32]) -> Result<()> {
        if vector.len() == self.dim {
            Ok(())
        } else {
            Err(LlmError::Protocol(format!(
                "embedding has dimension {}, expected {}",
                vector.len(),
                self.dim
            )))
        }
    }

    async fn send(&self, input: EmbeddingInput) -> Result<EmbeddingResponse> {
        let body = EmbeddingRequest {
            input,
            model: &self.model,
            input_type: "query",
        };

        let response = self.client.post(&self.api_url).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("embedding API error {status}: {text}");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

impl Embedder for HttpEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(async move {
            let input = EmbeddingInput::Single(format!("{QUERY_PREFIX}{text}"));
            let vector = self.send(input).await?.into_single()?;
            self.check_dim(&vector)?;
            Ok(vector)
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: EmbeddingInput,
    model: &'a str,
    input_type: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    data: Option<Vec<EmbeddingData>>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    fn into_many(self) -> Result<Vec<Vec<f32>>> {
        if let Some(embeddings) = self.embeddings {
            return Ok(embeddings);
        }
        if let Some(data) = self.data {
            return Ok(data.into_iter().map(|d| d.embedding).collect());
        }
        Err(LlmError::Protocol(
            "embedding not found in response: neither `embeddings` nor `data` present".into(),
        ))
    }

    fn into_single(self) -> Result<Vec<f32>> {
        self.into_many()?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Protocol("empty embedding response".into()))
    }
}

//! Backend-agnostic vector store interface.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Metadata attached to one stored record.
pub type Metadata = Map<String, Value>;

/// Columnar batch of records to insert. All columns must be equal length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordBatch {
    pub ids: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<Metadata>,
    pub documents: Vec<String>,
}

impl RecordBatch {
    /// # Errors
    ///
    /// Returns [`StoreError::LengthMismatch`] when any column disagrees
    /// in length with the others.
    pub fn validate(&self) -> Result<()> {
        let n = self.ids.len();
        if self.embeddings.len() == n && self.metadatas.len() == n && self.documents.len() == n {
            Ok(())
        } else {
            Err(StoreError::LengthMismatch {
                ids: self.ids.len(),
                embeddings: self.embeddings.len(),
                metadatas: self.metadatas.len(),
                documents: self.documents.len(),
            })
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Nearest-neighbour results, ordered by ascending distance.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub metadatas: Vec<Metadata>,
    pub documents: Vec<String>,
    pub distances: Vec<f32>,
}

/// A named-collection vector database.
///
/// Collections are created on demand: `add` and `query` both bring the
/// named collection into existence if it is missing, so a query against
/// an unknown collection yields zero results rather than an error.
pub trait VectorStore: Send + Sync {
    /// Insert a batch into `collection`, replacing records with matching ids.
    fn add<'a>(&'a self, collection: &'a str, batch: RecordBatch) -> BoxFuture<'a, Result<()>>;

    /// Return up to `n_results` nearest records by ascending distance.
    fn query<'a>(
        &'a self,
        collection: &'a str,
        embedding: &'a [f32],
        n_results: usize,
    ) -> BoxFuture<'a, Result<QueryResult>>;

    /// Names of all collections currently present.
    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<String>>>;
}

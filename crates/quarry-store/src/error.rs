#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("vector store request failed (status {status}): {body}")]
    Upstream { status: u16, body: String },

    /// A record batch with unequal column lengths. Rejected before any write.
    #[error("record batch columns disagree: ids={ids}, embeddings={embeddings}, metadatas={metadatas}, documents={documents}")]
    LengthMismatch {
        ids: usize,
        embeddings: usize,
        metadatas: usize,
        documents: usize,
    },

    #[error("vector store protocol violation: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

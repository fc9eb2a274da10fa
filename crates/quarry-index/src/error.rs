use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path does not exist: {0}")]
    MissingPath(PathBuf),

    /// Embedding output disagrees with chunk count. Nothing is written.
    #[error("chunk/embedding count mismatch: {chunks} chunks, {embeddings} embeddings")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error(transparent)]
    Embed(#[from] quarry_llm::LlmError),

    #[error(transparent)]
    Store(#[from] quarry_store::StoreError),
}

pub type Result<T> = std::result::Result<T, IndexError>;

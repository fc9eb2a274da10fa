#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error(transparent)]
    Llm(#[from] quarry_llm::LlmError),

    #[error(transparent)]
    Store(#[from] quarry_store::StoreError),
}

pub type Result<T> = std::result::Result<T, RagError>;

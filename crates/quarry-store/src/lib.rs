//! Vector storage for code chunks: a backend trait with in-memory and
//! Chroma implementations, plus the repository-scoped index layered on top.

pub mod chroma;
pub mod error;
pub mod in_memory;
pub mod repository;
pub mod vector_store;

pub use chroma::ChromaStore;
pub use error::{Result, StoreError};
pub use in_memory::InMemoryVectorStore;
pub use repository::{
    ChunkMeta, DEFAULT_COLLECTION, EmbeddedChunk, RepositoryIndex, SearchHit, collection_name,
};
pub use vector_store::{QueryResult, RecordBatch, VectorStore};

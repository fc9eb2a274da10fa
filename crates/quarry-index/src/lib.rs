//! Source ingestion: walk a workspace, cut files into definition-level
//! chunks, embed them, and write them into the repository index.

pub mod error;
pub mod extractor;
pub mod ingest;
pub mod languages;
pub mod scanner;

pub use error::{IndexError, Result};
pub use extractor::{Chunk, ChunkKind, extract_chunks};
pub use ingest::{IngestReport, IngestService, Ingestor};
pub use languages::{Lang, detect_language};
pub use scanner::scan_workspace;

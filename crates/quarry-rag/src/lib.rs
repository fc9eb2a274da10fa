//! Retrieval-augmented answering: prompt templates, the query engine's
//! synchronous and streaming paths, and the line-delimited JSON event
//! protocol clients consume.

pub mod error;
pub mod events;
pub mod query;
pub mod stream;
pub mod templates;

pub use error::{RagError, Result};
pub use events::StreamEvent;
pub use query::{Answer, QueryEngine, TOP_K};
pub use templates::{DEFAULT_TEMPLATE_NAME, Prompt, TemplateInfo, TemplateStore};

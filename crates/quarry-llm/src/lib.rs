//! HTTP clients for the embedding and language-model collaborators, plus the
//! streaming delta decoder that reassembles `data:` frames across arbitrary
//! chunk boundaries.

pub mod chat;
pub mod delta;
pub mod embedding;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{LlmError, Result};

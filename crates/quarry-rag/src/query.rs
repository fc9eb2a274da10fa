//! Synchronous question answering over the repository index.

use std::sync::Arc;
use std::time::Instant;

use quarry_llm::chat::ChatClient;
use quarry_llm::embedding::Embedder;
use quarry_store::{RepositoryIndex, SearchHit};

use crate::error::Result;
use crate::templates::TemplateStore;

/// Number of chunks retrieved per question.
pub const TOP_K: usize = 5;

/// A complete answer with timing.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub repository: Option<String>,
    pub execution_time: f64,
}

/// Ties retrieval, prompt rendering, and the chat model together.
pub struct QueryEngine {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) index: Arc<RepositoryIndex>,
    pub(crate) chat: ChatClient,
    pub(crate) templates: TemplateStore,
}

impl QueryEngine {
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<RepositoryIndex>,
        chat: ChatClient,
        templates: TemplateStore,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            templates,
        }
    }

    /// Nearest chunks for `question` within one repository (or the default
    /// collection).
    ///
    /// # Errors
    ///
    /// Fails on embedding or store errors.
    pub async fn retrieve(
        &self,
        question: &str,
        repository: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let embedding = self.embedder.embed(question).await?;
        let hits = self.index.search(repository, &embedding, TOP_K).await?;
        tracing::debug!(hits = hits.len(), "retrieved context chunks");
        Ok(hits)
    }

    /// Answer `question` in one round trip.
    ///
    /// An empty index is not an error: the model is prompted with empty
    /// context and answers from its own knowledge.
    ///
    /// # Errors
    ///
    /// Fails on embedding, store, or chat-completion errors.
    pub async fn answer(
        &self,
        question: &str,
        repository: Option<&str>,
        template: &str,
    ) -> Result<Answer> {
        let started = Instant::now();
        let hits = self.retrieve(question, repository).await?;
        let context = plain_context(&hits);
        let prompt = self.templates.render(template, &context, question);
        let answer = self.chat.complete(&prompt.system, &prompt.user).await?;
        Ok(Answer {
            answer,
            repository: repository.map(ToString::to_string),
            execution_time: started.elapsed().as_secs_f64(),
        })
    }
}

/// Context block for the synchronous path: bare `File:` headers, entries
/// separated by blank lines.
pub(crate) fn plain_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("File: {}:{}\n{}", h.file, h.start_line, h.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

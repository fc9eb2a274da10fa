//! Ingestion pipeline: resolve a repository name, extract chunks, embed
//! them one by one, and upsert the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quarry_core::{TaskStatus, TaskTracker};
use quarry_llm::embedding::Embedder;
use quarry_store::{ChunkMeta, EmbeddedChunk, RepositoryIndex};

use crate::error::{IndexError, Result};
use crate::extractor::{Chunk, extract_chunks};
use crate::languages::detect_language;
use crate::scanner::scan_workspace;

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub repository: String,
    pub files: usize,
    pub chunks: usize,
}

/// Drives the extract → embed → upsert pipeline.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<RepositoryIndex>,
}

impl Ingestor {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<RepositoryIndex>) -> Self {
        Self { embedder, index }
    }

    /// Ingest a single file or a whole workspace directory.
    ///
    /// Without an explicit `repository` name, a file is attributed to its
    /// parent directory's basename and a directory to its own basename.
    ///
    /// # Errors
    ///
    /// Fails on a missing path, unreadable files, embedding failures, a
    /// chunk/embedding count mismatch (nothing is written), or store
    /// failures.
    pub async fn ingest_path(&self, path: &Path, repository: Option<&str>) -> Result<IngestReport> {
        if path.is_file() {
            self.ingest_file(path, repository).await
        } else if path.is_dir() {
            self.ingest_workspace(path, repository).await
        } else {
            Err(IndexError::MissingPath(path.to_path_buf()))
        }
    }

    async fn ingest_file(&self, path: &Path, repository: Option<&str>) -> Result<IngestReport> {
        let repository = match repository {
            Some(name) => name.to_string(),
            None => parent_basename(path)?,
        };
        let chunks = read_and_extract(path).await?;
        self.finish(repository, 1, chunks).await
    }

    async fn ingest_workspace(&self, dir: &Path, repository: Option<&str>) -> Result<IngestReport> {
        let repository = match repository {
            Some(name) => name.to_string(),
            None => dir_basename(dir)?,
        };
        let mut chunks = Vec::new();
        let mut files = 0usize;
        for file in scan_workspace(dir) {
            chunks.extend(read_and_extract(&file).await?);
            files += 1;
        }
        self.finish(repository, files, chunks).await
    }

    async fn finish(
        &self,
        repository: String,
        files: usize,
        chunks: Vec<Chunk>,
    ) -> Result<IngestReport> {
        tracing::info!(repository, files, chunks = chunks.len(), "embedding chunks");

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_sequence(&contents).await?;
        if embeddings.len() != chunks.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let records: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk {
                content: chunk.content,
                embedding,
                meta: ChunkMeta {
                    file: chunk.file,
                    start_line: chunk.start_line,
                    kind: chunk.kind.as_str().to_string(),
                    name: chunk.name,
                },
            })
            .collect();
        let count = records.len();
        self.index.upsert(Some(&repository), records).await?;

        tracing::info!(repository, count, "ingestion complete");
        Ok(IngestReport {
            repository,
            files,
            chunks: count,
        })
    }
}

async fn read_and_extract(path: &Path) -> Result<Vec<Chunk>> {
    let Some(lang) = detect_language(path) else {
        return Ok(Vec::new());
    };
    let bytes = tokio::fs::read(path).await?;
    let source = String::from_utf8_lossy(&bytes);
    Ok(extract_chunks(&source, lang, &path.display().to_string()))
}

fn parent_basename(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    absolute
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IndexError::MissingPath(path.to_path_buf()))
}

fn dir_basename(dir: &Path) -> Result<String> {
    let absolute = std::path::absolute(dir)?;
    absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IndexError::MissingPath(dir.to_path_buf()))
}

/// Schedules ingestion runs as tracked background jobs.
pub struct IngestService {
    ingestor: Arc<Ingestor>,
    tracker: Arc<TaskTracker>,
}

impl IngestService {
    #[must_use]
    pub fn new(ingestor: Arc<Ingestor>, tracker: Arc<TaskTracker>) -> Self {
        Self { ingestor, tracker }
    }

    #[must_use]
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Validate `path`, record a `started` task, and run ingestion in the
    /// background. Returns the task id immediately.
    ///
    /// # Errors
    ///
    /// Fails fast when `path` does not exist; every later failure surfaces
    /// through the task record instead.
    pub fn start(&self, path: PathBuf, repository: Option<String>) -> Result<String> {
        if !path.exists() {
            return Err(IndexError::MissingPath(path));
        }

        let display_repo = repository.clone().unwrap_or_else(|| {
            if path.is_dir() {
                dir_basename(&path).unwrap_or_default()
            } else {
                parent_basename(&path).unwrap_or_default()
            }
        });
        let task_id = self
            .tracker
            .create("ingestion", &display_repo, &path.display().to_string());

        let ingestor = Arc::clone(&self.ingestor);
        let tracker = Arc::clone(&self.tracker);
        let id = task_id.clone();
        tokio::spawn(async move {
            tracker.update(
                &id,
                TaskStatus::Processing,
                format!("Processing {}", path.display()),
            );
            match ingestor.ingest_path(&path, repository.as_deref()).await {
                Ok(report) => tracker.update(
                    &id,
                    TaskStatus::Completed,
                    format!(
                        "Ingested {} chunks from {} files into {}",
                        report.chunks, report.files, report.repository
                    ),
                ),
                Err(err) => {
                    tracing::error!(task = id, "ingestion failed: {err}");
                    tracker.update(&id, TaskStatus::Error, format!("Ingestion failed: {err}"));
                }
            }
        });

        Ok(task_id)
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use quarry_core::config::StoreBackend;
use quarry_core::{Config, TaskTracker};
use quarry_index::{IngestService, Ingestor};
use quarry_llm::chat::ChatClient;
use quarry_llm::embedding::HttpEmbedder;
use quarry_rag::{DEFAULT_TEMPLATE_NAME, QueryEngine, TemplateStore};
use quarry_store::{ChromaStore, InMemoryVectorStore, RepositoryIndex, VectorStore};

#[derive(Parser)]
#[command(name = "quarry", version, about = "Ask questions about your code")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "quarry.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a source file or workspace directory.
    Ingest {
        /// File or directory to ingest. Defaults to `workspace_dir` from config.
        path: Option<PathBuf>,
        /// Repository name; derived from the path when omitted.
        #[arg(short, long)]
        repository: Option<String>,
    },
    /// Ask a question about an ingested repository.
    Ask {
        question: String,
        /// Repository to search; the default collection when omitted.
        #[arg(short, long)]
        repository: Option<String>,
        /// Prompt template name (without .txt extension).
        #[arg(short, long, default_value = DEFAULT_TEMPLATE_NAME)]
        template: String,
        /// Emit the answer as a line-delimited JSON event stream.
        #[arg(long)]
        stream: bool,
        /// Append the retrieval context after the answer (stream mode).
        #[arg(long)]
        include_context: bool,
    },
    /// List ingested repositories.
    Repos,
    /// List available prompt templates.
    Templates,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let store: Arc<dyn VectorStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryVectorStore::new()),
        StoreBackend::Chroma => Arc::new(ChromaStore::new(config.store.url.clone())),
    };
    let index = Arc::new(RepositoryIndex::new(store));
    let embedder = Arc::new(HttpEmbedder::new(
        config.embedding.api_url.clone(),
        config.embedding.model.clone(),
        config.embedding.dim,
    ));

    match cli.command {
        Command::Ingest { path, repository } => {
            let path = path
                .or_else(|| config.workspace_dir.as_ref().map(PathBuf::from))
                .context("no path given and no workspace_dir configured")?;
            run_ingest(embedder, index, path, repository).await
        }
        Command::Ask {
            question,
            repository,
            template,
            stream,
            include_context,
        } => {
            let engine = QueryEngine::new(
                embedder,
                index,
                ChatClient::new(
                    config.llm.api_url.clone(),
                    config.llm.model.clone(),
                    config.llm.temperature,
                ),
                TemplateStore::new(&config.templates.dir),
            );
            if stream {
                run_ask_stream(&engine, &question, repository, &template, include_context).await
            } else {
                let answer = engine
                    .answer(&question, repository.as_deref(), &template)
                    .await?;
                println!("{}", answer.answer);
                tracing::info!(seconds = answer.execution_time, "query finished");
                Ok(())
            }
        }
        Command::Repos => {
            for repository in index.list_repositories().await? {
                println!("{repository}");
            }
            Ok(())
        }
        Command::Templates => {
            for template in TemplateStore::new(&config.templates.dir).list() {
                println!("{}\t{}", template.name, template.path.display());
            }
            Ok(())
        }
    }
}

async fn run_ingest(
    embedder: Arc<HttpEmbedder>,
    index: Arc<RepositoryIndex>,
    path: PathBuf,
    repository: Option<String>,
) -> anyhow::Result<()> {
    let tracker = Arc::new(TaskTracker::new());
    let ingestor = Arc::new(Ingestor::new(embedder, index));
    let service = IngestService::new(ingestor, Arc::clone(&tracker));

    let task_id = service.start(path, repository)?;
    println!("task {task_id}");

    // Follow the background job until it settles.
    let mut last = String::new();
    loop {
        let Some(record) = tracker.get(&task_id) else {
            anyhow::bail!("task record vanished");
        };
        if record.message != last {
            eprintln!("[{}] {}", record.status, record.message);
            last = record.message.clone();
        }
        if record.status.is_terminal() {
            anyhow::ensure!(
                record.status == quarry_core::TaskStatus::Completed,
                "ingestion failed: {}",
                record.message
            );
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

async fn run_ask_stream(
    engine: &QueryEngine,
    question: &str,
    repository: Option<String>,
    template: &str,
    include_context: bool,
) -> anyhow::Result<()> {
    let mut events = engine
        .answer_stream(question, repository, template, include_context)
        .await?;
    while let Some(event) = events.next().await {
        print!("{}", event.to_json_line()?);
    }
    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_subcommand_parses() {
        for args in [
            vec!["quarry", "ingest", "src", "-r", "myrepo"],
            vec!["quarry", "ask", "where is auth?", "-r", "myrepo", "--stream"],
            vec!["quarry", "repos"],
            vec!["quarry", "templates"],
        ] {
            assert!(Cli::try_parse_from(&args).is_ok(), "failed: {args:?}");
        }
    }

    // Task records are process-local; the followable surface for them is
    // `ingest` itself, which polls its task to a terminal state.
    #[test]
    fn no_detached_task_lookup_subcommand() {
        assert!(Cli::try_parse_from(["quarry", "status", "ingestion_123"]).is_err());
    }
}

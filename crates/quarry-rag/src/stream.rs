//! Streaming answer path: upstream deltas reframed into the client event
//! protocol.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use quarry_llm::chat::ChatClient;
use quarry_llm::delta::DeltaDecoder;
use quarry_store::SearchHit;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

use crate::error::Result;
use crate::events::StreamEvent;
use crate::query::QueryEngine;
use crate::templates::Prompt;

const CONTEXT_DELIMITER: &str = "--- CONTEXT_DELIMITER ---";

/// Receiver side of the stream hung up. Emission stops and the upstream
/// transfer is dropped mid-flight.
struct ClientGone;

impl QueryEngine {
    /// Answer `question` as a stream of protocol events.
    ///
    /// Retrieval and prompt rendering happen before the stream exists, so
    /// their failures surface as a plain `Err`. Once the stream is handed
    /// out every failure is reported in-band as an `error` event and the
    /// stream still closes with `end`.
    ///
    /// # Errors
    ///
    /// Fails on embedding or store errors during retrieval.
    pub async fn answer_stream(
        &self,
        question: &str,
        repository: Option<String>,
        template: &str,
        include_context: bool,
    ) -> Result<ReceiverStream<StreamEvent>> {
        let started = Instant::now();
        let hits = self.retrieve(question, repository.as_deref()).await?;
        let context = markdown_context(&hits);
        let prompt = self.templates.render(template, &context, question);
        let chat = self.chat.clone();

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let outcome = run_stream(
                &chat,
                &prompt,
                &tx,
                started,
                repository,
                include_context.then_some(context),
            )
            .await;
            if outcome.is_err() {
                tracing::debug!("client disconnected, aborting stream");
            }
        });
        Ok(ReceiverStream::new(rx))
    }
}

async fn emit(
    tx: &mpsc::Sender<StreamEvent>,
    event: StreamEvent,
) -> std::result::Result<(), ClientGone> {
    tx.send(event).await.map_err(|_| ClientGone)
}

async fn run_stream(
    chat: &ChatClient,
    prompt: &Prompt,
    tx: &mpsc::Sender<StreamEvent>,
    started: Instant,
    repository: Option<String>,
    trailing_context: Option<String>,
) -> std::result::Result<(), ClientGone> {
    emit(
        tx,
        StreamEvent::Start {
            repository,
            timestamp: epoch_secs(),
        },
    )
    .await?;

    match chat.stream(&prompt.system, &prompt.user).await {
        Ok(response) => {
            let mut decoder = DeltaDecoder::new();
            let mut body = response.bytes_stream();
            let mut broken = false;
            while let Some(item) = body.next().await {
                match item {
                    Ok(bytes) => {
                        for fragment in decoder.feed(&bytes) {
                            emit(tx, StreamEvent::Content { content: fragment }).await?;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("upstream body failed mid-stream: {err}");
                        emit(
                            tx,
                            StreamEvent::Error {
                                content: format!("Error during streaming: {err}"),
                            },
                        )
                        .await?;
                        broken = true;
                        break;
                    }
                }
            }
            if !broken {
                for fragment in decoder.finish() {
                    emit(tx, StreamEvent::Content { content: fragment }).await?;
                }
            }
            if decoder.dropped() > 0 {
                tracing::debug!(
                    dropped = decoder.dropped(),
                    "undecodable frames dropped during stream"
                );
            }
        }
        Err(err) => {
            emit(
                tx,
                StreamEvent::Error {
                    content: format!("Error during streaming: {err}"),
                },
            )
            .await?;
        }
    }

    emit(
        tx,
        StreamEvent::End {
            execution_time: started.elapsed().as_secs_f64(),
        },
    )
    .await?;

    if let Some(context) = trailing_context {
        emit(
            tx,
            StreamEvent::Content {
                content: format!("\n\n{CONTEXT_DELIMITER}\n\n{context}"),
            },
        )
        .await?;
    }
    Ok(())
}

/// Context block for the streaming path: bold `File:` headers with fenced,
/// trimmed chunk bodies, so clients can render and parse it directly.
#[must_use]
pub fn markdown_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "**File: {}:{}**\n```\n{}\n```",
                h.file,
                h.start_line,
                h.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateStore;
    use quarry_llm::embedding::Embedder;
    use quarry_llm::mock::MockEmbedder;
    use quarry_store::{ChunkMeta, EmbeddedChunk, InMemoryVectorStore, RepositoryIndex};
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hit(file: &str, line: usize, content: &str) -> SearchHit {
        SearchHit {
            file: file.to_string(),
            start_line: line,
            kind: "function".to_string(),
            name: None,
            content: content.to_string(),
            distance: 0.0,
        }
    }

    #[test]
    fn markdown_context_trims_and_fences() {
        let hits = vec![hit("a.py", 7, "\ndef a():\n    pass\n")];
        assert_eq!(
            markdown_context(&hits),
            "**File: a.py:7**\n```\ndef a():\n    pass\n```"
        );
    }

    #[test]
    fn markdown_context_joins_with_blank_lines() {
        let hits = vec![hit("a.py", 1, "x"), hit("b.py", 2, "y")];
        assert_eq!(
            markdown_context(&hits),
            "**File: a.py:1**\n```\nx\n```\n\n**File: b.py:2**\n```\ny\n```"
        );
    }

    fn delta_body(fragments: &[&str]) -> String {
        let mut body = String::new();
        for fragment in fragments {
            body.push_str(&format!(
                "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{fragment}\"}}}}]}}\n"
            ));
        }
        body.push_str("data: [DONE]\n");
        body
    }

    async fn engine(chat_url: String, seeded: bool) -> QueryEngine {
        let embedder = Arc::new(MockEmbedder::new(8));
        let index = Arc::new(RepositoryIndex::new(Arc::new(InMemoryVectorStore::new())));
        if seeded {
            index
                .upsert(
                    Some("demo"),
                    vec![EmbeddedChunk {
                        content: "def pay(): ...\n".into(),
                        embedding: embedder.embed("def pay(): ...\n").await.unwrap(),
                        meta: ChunkMeta {
                            file: "pay.py".into(),
                            start_line: 4,
                            kind: "function".into(),
                            name: Some("pay".into()),
                        },
                    }],
                )
                .await
                .unwrap();
        }
        QueryEngine::new(
            embedder,
            index,
            ChatClient::new(chat_url, "gpt-4".into(), 0.7),
            TemplateStore::new("/no/such/dir"),
        )
    }

    async fn collect(mut stream: ReceiverStream<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn stream_emits_start_contents_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(delta_body(&["Hello", " world"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let engine = engine(server.uri(), false).await;
        let stream = engine
            .answer_stream("q", Some("demo".into()), "t", false)
            .await
            .unwrap();
        let events = collect(stream).await;

        assert!(matches!(
            &events[0],
            StreamEvent::Start { repository: Some(r), .. } if r == "demo"
        ));
        assert_eq!(
            events[1],
            StreamEvent::Content {
                content: "Hello".into()
            }
        );
        assert_eq!(
            events[2],
            StreamEvent::Content {
                content: " world".into()
            }
        );
        assert!(matches!(events[3], StreamEvent::End { .. }));
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn upstream_failure_reports_error_then_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let engine = engine(server.uri(), false).await;
        let stream = engine.answer_stream("q", None, "t", false).await.unwrap();
        let events = collect(stream).await;

        assert!(matches!(events[0], StreamEvent::Start { repository: None, .. }));
        assert!(matches!(
            &events[1],
            StreamEvent::Error { content } if content.starts_with("Error during streaming: ")
        ));
        assert!(matches!(events[2], StreamEvent::End { .. }));
    }

    #[tokio::test]
    async fn include_context_appends_trailing_content_after_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(delta_body(&["ok"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let engine = engine(server.uri(), true).await;
        let stream = engine
            .answer_stream("payment", Some("demo".into()), "t", true)
            .await
            .unwrap();
        let events = collect(stream).await;

        let last = events.last().unwrap();
        let StreamEvent::Content { content } = last else {
            panic!("expected trailing content event, got {last:?}");
        };
        assert!(content.starts_with("\n\n--- CONTEXT_DELIMITER ---\n\n"));
        assert!(content.contains("**File: pay.py:4**"));
        assert!(content.contains("def pay(): ..."));
        // end comes before the context payload
        let end_pos = events
            .iter()
            .position(|e| matches!(e, StreamEvent::End { .. }))
            .unwrap();
        assert_eq!(end_pos, events.len() - 2);
    }

    #[tokio::test]
    async fn undecodable_frames_are_dropped_silently() {
        let server = MockServer::start().await;
        let body = format!("data: {{broken\n{}", delta_body(&["fine"]));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let engine = engine(server.uri(), false).await;
        let stream = engine.answer_stream("q", None, "t", false).await.unwrap();
        let events = collect(stream).await;

        let contents: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Content { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(contents, vec!["fine"]);
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error { .. })));
    }

    #[tokio::test]
    async fn dropping_receiver_stops_the_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(delta_body(&["a", "b", "c"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let engine = engine(server.uri(), false).await;
        let stream = engine.answer_stream("q", None, "t", false).await.unwrap();
        drop(stream);
        // nothing to assert beyond "no panic"; the spawned task notices the
        // closed channel on its next send and bails out
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

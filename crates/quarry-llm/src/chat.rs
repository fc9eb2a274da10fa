//! Chat-completion client for the upstream language model.

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::http::{UPSTREAM_TIMEOUT, default_client};

/// Client for the OpenAI-style chat-completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    #[must_use]
    pub fn new(api_url: String, model: String, temperature: f32) -> Self {
        Self {
            client: default_client(UPSTREAM_TIMEOUT),
            api_url,
            model,
            temperature,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn request_body<'a>(&'a self, system: &'a str, user: &'a str, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: system,
                },
                ApiMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            stream,
        }
    }

    /// Submit a prompt and return one complete answer.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or a
    /// response without choices.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = self.request_body(system, user, false);

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("LLM API error {status}: {text}");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let resp: ChatResponse = serde_json::from_str(&text)?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse {
                endpoint: "chat/completions",
            })
    }

    /// Open a streaming completion and hand back the raw response.
    ///
    /// The body arrives as `data: <json>\n` frames with arbitrary chunk
    /// boundaries; feed it through [`crate::delta::DeltaDecoder`].
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    pub async fn stream(&self, system: &str, user: &str) -> Result<reqwest::Response> {
        let body = self.request_body(system, user, true);

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(LlmError::Http)?;
            tracing::error!("LLM API streaming error {status}: {text}");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(response)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

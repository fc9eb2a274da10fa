#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success status from an upstream service, with the body for context.
    #[error("upstream request failed (status {status}): {body}")]
    Upstream { status: u16, body: String },

    /// A remote response lacked the expected shape. Never silently defaulted.
    #[error("upstream protocol violation: {0}")]
    Protocol(String),

    #[error("empty response from {endpoint}")]
    EmptyResponse { endpoint: &'static str },
}

pub type Result<T> = std::result::Result<T, LlmError>;

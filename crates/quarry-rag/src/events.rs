//! Line-delimited JSON events streamed to clients.
//!
//! The wire shape is a fixed contract: one JSON object per line with a
//! `type` tag. Field names and nesting must not change, clients parse
//! these records directly.

use serde::{Deserialize, Serialize};

/// One record of the client stream protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Opens every stream; `repository` is echoed as requested, absent one
    /// is `null`.
    Start {
        repository: Option<String>,
        timestamp: f64,
    },
    /// One text fragment of the answer, in arrival order.
    Content { content: String },
    /// Upstream trouble, reported in-band. The stream still ends normally.
    Error { content: String },
    /// Closes the answer; wall-clock seconds from request acceptance.
    End { execution_time: f64 },
}

impl StreamEvent {
    /// Serialize as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Fails only if a float field is non-finite.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

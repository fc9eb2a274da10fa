//! Incremental decoder for `data: <json>` frames in a streaming response.
//!
//! Network chunks split frames at arbitrary byte offsets, so the decoder
//! buffers raw bytes and only consumes a frame once its terminating newline
//! has arrived. The text fragments produced are therefore identical no
//! matter how the transport slices the body.

use serde::Deserialize;

const FRAME_MARKER: &[u8] = b"data:";

/// Reassembles `data:` frames from raw byte chunks and yields the
/// text fragments they carry.
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    buffer: Vec<u8>,
    dropped: usize,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl DeltaDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames whose payload failed to parse as JSON and were discarded.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Feed one transport chunk; returns the fragments completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        loop {
            let Some(marker) = find(&self.buffer, FRAME_MARKER) else {
                break;
            };
            let payload_start = marker + FRAME_MARKER.len();
            let Some(newline) = self.buffer[payload_start..]
                .iter()
                .position(|&b| b == b'\n')
            else {
                // Frame not terminated yet. Bytes before the marker can
                // never start another frame, so drop them now.
                self.buffer.drain(..marker);
                break;
            };
            let payload = self.buffer[payload_start..payload_start + newline].to_vec();
            self.buffer.drain(..=payload_start + newline);
            if let Some(fragment) = self.decode_payload(&payload) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    /// Flush a trailing frame left unterminated at end of stream.
    pub fn finish(&mut self) -> Vec<String> {
        let buffer = std::mem::take(&mut self.buffer);
        let mut fragments = Vec::new();
        if let Some(marker) = find(&buffer, FRAME_MARKER) {
            let payload = &buffer[marker + FRAME_MARKER.len()..];
            if let Some(fragment) = self.decode_payload(payload) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    fn decode_payload(&mut self, payload: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(payload);
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "[DONE]" {
            return None;
        }
        match serde_json::from_str::<StreamChunk>(trimmed) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|content| !content.is_empty()),
            Err(err) => {
                self.dropped += 1;
                tracing::debug!("dropping undecodable stream frame: {err}");
                None
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

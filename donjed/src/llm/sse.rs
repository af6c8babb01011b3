//! Line-oriented decoder for chat completion event streams.

use super::wire::ChatCompletionChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Turns raw body bytes into text fragments.
///
/// Bytes after the last newline are held until the next push, so frames
/// split across reads (including split UTF-8 sequences) decode intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk and return the fragments of every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut fragments = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(fragment) = decode_line(&String::from_utf8_lossy(&line)) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    /// Decode whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        decode_line(&String::from_utf8_lossy(&rest))
    }
}

/// Extract the text fragment carried by one event line.
///
/// Lines that are not `data: ` frames, the `[DONE]` terminator, malformed
/// JSON and frames without content all yield `None`.
pub fn decode_line(line: &str) -> Option<String> {
    let data = line.trim().strip_prefix(DATA_PREFIX)?;
    if data == DONE_MARKER {
        return None;
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => chunk.into_content(),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed stream frame");
            None
        }
    }
}

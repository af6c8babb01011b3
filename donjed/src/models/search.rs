use serde::Serialize;

use super::DocumentChunk;

/// A scored chunk produced fresh for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Outcome of the retrieval half of a chat turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RagContext {
    pub context: String,
    pub has_context: bool,
}

impl RagContext {
    pub fn empty() -> Self {
        Self::default()
    }
}

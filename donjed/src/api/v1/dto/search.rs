//! Search request/response DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::SearchResult;

/// Upper bound on `topK` accepted by the search endpoint.
pub const MAX_TOP_K: usize = 20;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    /// Number of results, clamped to `1..=20`. Defaults to `RAG_TOP_K`.
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub source: String,
    pub score: f32,
    pub text: String,
}

impl From<SearchResult> for SearchResultItem {
    fn from(result: SearchResult) -> Self {
        Self {
            id: result.chunk.id,
            source: result.chunk.source,
            score: result.score,
            text: result.chunk.text,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Whether a chat turn with this text would consult the knowledge base.
    pub is_document_query: bool,
    pub results: Vec<SearchResultItem>,
    /// The documentation block a chat turn would inject.
    pub context: String,
}

use async_trait::async_trait;

use crate::error::Result;
use crate::models::SearchResult;

/// Ranks knowledge-base chunks against a query.
///
/// Implementations return at most `top_k` results, best first, with no
/// zero-score entries.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>>;

    /// Short name used in logs and the health endpoint.
    fn name(&self) -> &'static str;
}

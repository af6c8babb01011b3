use std::sync::Arc;

use async_trait::async_trait;

use crate::embeddings::EmbeddingApiClient;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::models::{DocumentChunk, SearchResult};

use super::{keyword_search, EmbeddingCache, Retriever};

/// Cosine similarity of two vectors; 0 on length mismatch or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Embedding-based retrieval, enabled with `RETRIEVAL_MODE=semantic`.
///
/// Falls back to keyword search when the query cannot be embedded.
#[derive(Clone)]
pub struct SemanticRetriever {
    knowledge: Arc<KnowledgeBase>,
    embeddings: EmbeddingApiClient,
    cache: EmbeddingCache,
}

impl SemanticRetriever {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        embeddings: EmbeddingApiClient,
        cache: EmbeddingCache,
    ) -> Self {
        Self {
            knowledge,
            embeddings,
            cache,
        }
    }

    /// Precomputed vector, then cache, then a fresh embedding stored in the
    /// cache. `None` when no vector can be had.
    async fn chunk_embedding(&self, chunk: &DocumentChunk) -> Option<Vec<f32>> {
        if let Some(embedding) = chunk.embedding.as_ref().filter(|e| !e.is_empty()) {
            return Some(embedding.clone());
        }
        if let Some(embedding) = self.cache.get(&chunk.id) {
            return Some(embedding);
        }

        match self.embeddings.embed(&chunk.text).await {
            Ok(embedding) if !embedding.is_empty() => {
                self.cache.put(chunk.id.clone(), embedding.clone());
                Some(embedding)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(chunk_id = %chunk.id, error = %e, "Failed to embed chunk");
                None
            }
        }
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = match self.embeddings.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed, using keyword search");
                Vec::new()
            }
        };

        if query_embedding.is_empty() {
            return Ok(keyword_search(query, self.knowledge.chunks(), top_k));
        }

        let mut results = Vec::new();
        for chunk in self.knowledge.chunks() {
            let Some(embedding) = self.chunk_embedding(chunk).await else {
                continue;
            };
            let score = cosine_similarity(&query_embedding, &embedding);
            if score > 0.0 {
                results.push(SearchResult {
                    chunk: chunk.clone(),
                    score,
                });
            }
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        tracing::debug!(query, hits = results.len(), "Semantic search complete");
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingsConfig, LlmConfig};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embeddings_config() -> EmbeddingsConfig {
        EmbeddingsConfig {
            model: "text-embedding-004".to_string(),
            cache_size: 16,
        }
    }

    fn knowledge() -> Arc<KnowledgeBase> {
        let mut pricing =
            DocumentChunk::new("pricing", 0, "The 5kVA system price".to_string(), 1);
        pricing.embedding = Some(vec![1.0, 0.0]);
        let mut faq = DocumentChunk::new("faq", 0, "Cloudy days".to_string(), 1);
        faq.embedding = Some(vec![0.0, 1.0]);
        Arc::new(KnowledgeBase::build(vec![pricing, faq]))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]) - 0.70710677).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn test_falls_back_to_keyword_without_credential() {
        let llm = LlmConfig::default();
        let client = EmbeddingApiClient::new(&llm, &embeddings_config()).unwrap();
        let retriever = SemanticRetriever::new(knowledge(), client, EmbeddingCache::new(16));

        let results = retriever.search("price", 3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.source, "pricing");
        assert_eq!(results[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_ranks_by_similarity_and_caches_fresh_embeddings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(serde_json::json!({"input": "cloudy"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.9]}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(serde_json::json!({"input": "Battery backup"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.5, 0.5]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let llm = LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: Some("test-key".to_string()),
            ..LlmConfig::default()
        };
        let client = EmbeddingApiClient::new(&llm, &embeddings_config()).unwrap();

        let mut chunks = knowledge().documents.clone();
        chunks.push(DocumentChunk::new("batteries", 0, "Battery backup".to_string(), 1));
        let kb = Arc::new(KnowledgeBase::build(chunks));
        let cache = EmbeddingCache::new(16);
        let retriever = SemanticRetriever::new(kb, client, cache.clone());

        let results = retriever.search("cloudy", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source, "faq");
        assert_eq!(results[1].chunk.source, "batteries");
        assert_eq!(cache.get("batteries_chunk_0"), Some(vec![0.5, 0.5]));

        // Second search must reuse the cached chunk vector.
        retriever.search("cloudy", 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_drops_chunks_without_positive_similarity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [-1.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let llm = LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: Some("test-key".to_string()),
            ..LlmConfig::default()
        };
        let client = EmbeddingApiClient::new(&llm, &embeddings_config()).unwrap();
        let retriever = SemanticRetriever::new(knowledge(), client, EmbeddingCache::new(16));

        // Opposed to pricing and orthogonal to faq.
        let results = retriever.search("nothing alike", 3).await.unwrap();
        assert!(results.is_empty());
    }
}

//! Term-frequency retrieval with an exact-phrase bonus.
//!
//! Scores are raw term counts plus a flat phrase bonus, with no TF-IDF or
//! BM25 weighting.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::models::{DocumentChunk, SearchResult};

use super::Retriever;

pub const DEFAULT_TOP_K: usize = 3;

/// Added when a chunk contains the whole lowercased query verbatim.
pub const PHRASE_BONUS: f32 = 10.0;

/// Tokens this short carry no signal ("a", "is", "of").
const MIN_TOKEN_CHARS: usize = 3;

/// Score every chunk against `query` and return the best `top_k`.
///
/// Results are sorted by descending score. Ties keep corpus order and
/// chunks scoring zero are dropped. A blank query matches nothing.
pub fn keyword_search(query: &str, chunks: &[DocumentChunk], top_k: usize) -> Vec<SearchResult> {
    let query_lower = query.to_lowercase();
    if query_lower.trim().is_empty() || top_k == 0 {
        return Vec::new();
    }

    let patterns = term_patterns(&query_lower);

    let mut results: Vec<SearchResult> = chunks
        .iter()
        .filter_map(|chunk| {
            let text = chunk.text.to_lowercase();
            let mut score: f32 = patterns
                .iter()
                .map(|pattern| pattern.find_iter(&text).count() as f32)
                .sum();
            if text.contains(&query_lower) {
                score += PHRASE_BONUS;
            }
            (score > 0.0).then(|| SearchResult {
                chunk: chunk.clone(),
                score,
            })
        })
        .collect();

    // sort_by is stable, so equal scores stay in corpus order.
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    results
}

/// One literal pattern per query token. A token whose pattern fails to
/// compile is dropped and so contributes nothing.
fn term_patterns(query_lower: &str) -> Vec<Regex> {
    query_lower
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .filter_map(|token| match Regex::new(&regex::escape(token)) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::debug!(token, error = %e, "Skipping unmatchable query token");
                None
            }
        })
        .collect()
}

/// Keyword retrieval over the loaded knowledge base.
#[derive(Clone)]
pub struct KeywordRetriever {
    knowledge: Arc<KnowledgeBase>,
}

impl KeywordRetriever {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let results = keyword_search(query, self.knowledge.chunks(), top_k);
        tracing::debug!(query, hits = results.len(), "Keyword search complete");
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(source: &str, index: usize, text: &str) -> DocumentChunk {
        DocumentChunk::new(source, index, text.to_string(), 1)
    }

    fn corpus() -> Vec<DocumentChunk> {
        vec![
            chunk(
                "pricing",
                0,
                "The 5kVA system costs N2,500,000 including installation. Price excludes batteries.",
            ),
            chunk("faq", 0, "Solar panels still charge on cloudy days, at reduced output."),
            chunk("faq", 1, "Our warranty covers inverter faults for five years."),
            chunk("about", 0, "DonJed Energy Solutions is based in Lagos."),
        ]
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.id.as_str()).collect()
    }

    #[test]
    fn test_price_query_finds_pricing_chunk() {
        let results = keyword_search("what is the price of the 5kVA system", &corpus(), 3);

        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.source, "pricing");
    }

    #[test]
    fn test_short_tokens_are_ignored() {
        // "is", "on" and "at" are all dropped; nothing else matches.
        assert!(keyword_search("is on at", &corpus(), 3).is_empty());
    }

    #[test]
    fn test_counts_every_occurrence() {
        let chunks = vec![chunk("a", 0, "battery battery battery"), chunk("b", 0, "battery")];
        let results = keyword_search("battery life", &chunks, 3);

        assert_eq!(ids(&results), vec!["a_chunk_0", "b_chunk_0"]);
        assert_eq!(results[0].score, 3.0);
        assert_eq!(results[1].score, 1.0);
    }

    #[test]
    fn test_score_monotonic_in_term_occurrences() {
        let query = "inverter warranty";
        let base = "The inverter is covered by warranty.";
        let mut previous = 0.0;
        for extra in 0..4 {
            let text = format!("{base}{}", " inverter".repeat(extra));
            let results = keyword_search(query, &[chunk("doc", 0, &text)], 1);
            let score = results[0].score;
            assert!(score > previous, "score {score} should exceed {previous}");
            previous = score;
        }
    }

    #[test]
    fn test_exact_phrase_outranks_scattered_terms() {
        let chunks = vec![
            chunk("scattered", 0, "solar here. panel there. solar again. panel again."),
            chunk("phrase", 0, "Every solar panel ships with mounting rails."),
        ];
        let results = keyword_search("solar panel", &chunks, 2);

        assert_eq!(results[0].chunk.source, "phrase");
        assert_eq!(results[0].score, 2.0 + PHRASE_BONUS);
        assert_eq!(results[1].score, 4.0);
    }

    #[test]
    fn test_top_k_bound_and_no_zero_scores() {
        let chunks: Vec<_> = (0..10)
            .map(|i| {
                let text = if i % 2 == 0 {
                    "battery backup".to_string()
                } else {
                    "nothing relevant".to_string()
                };
                DocumentChunk::new("doc", i, text, 1)
            })
            .collect();

        for top_k in 0..8 {
            let results = keyword_search("battery", &chunks, top_k);
            assert!(results.len() <= top_k);
            assert!(results.iter().all(|r| r.score > 0.0));
        }
        assert_eq!(keyword_search("battery", &chunks, 10).len(), 5);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let chunks = vec![
            chunk("c", 0, "inverter"),
            chunk("a", 0, "inverter"),
            chunk("b", 0, "inverter"),
        ];
        let results = keyword_search("inverter", &chunks, 3);
        assert_eq!(ids(&results), vec!["c_chunk_0", "a_chunk_0", "b_chunk_0"]);
    }

    #[test]
    fn test_regex_metacharacters_match_literally() {
        let chunks = vec![chunk("a", 0, "Is (5kva) enough?"), chunk("b", 0, "5kva")];
        let results = keyword_search("(5kva)", &chunks, 3);

        assert_eq!(ids(&results), vec!["a_chunk_0"]);
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        assert!(keyword_search("", &corpus(), 3).is_empty());
        assert!(keyword_search("   ", &corpus(), 3).is_empty());
        assert!(keyword_search("solar", &corpus(), 0).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let results = keyword_search("DONJED", &corpus(), 3);
        assert_eq!(ids(&results), vec!["about_chunk_0"]);
    }

    #[tokio::test]
    async fn test_keyword_retriever_uses_knowledge_base() {
        let kb = Arc::new(KnowledgeBase::build(corpus()));
        let retriever = KeywordRetriever::new(kb);

        let results = retriever.search("cloudy weather", 3).await.unwrap();
        assert_eq!(ids(&results), vec!["faq_chunk_0"]);
        assert_eq!(retriever.name(), "keyword");
    }
}

use std::sync::Arc;

use crate::config::{Config, RetrievalMode};
use crate::embeddings::EmbeddingApiClient;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::llm::LlmStreamClient;
use crate::search::{EmbeddingCache, KeywordRetriever, Retriever, SemanticRetriever};
use crate::services::{ChatService, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub knowledge: Arc<KnowledgeBase>,
    pub chat: ChatService,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: Config, knowledge: Arc<KnowledgeBase>, chat: ChatService) -> Self {
        let sessions = Arc::new(SessionStore::with_capacity(config.server.max_sessions));
        Self {
            config: Arc::new(config),
            knowledge,
            chat,
            sessions,
        }
    }

    /// Wire the retriever selected by `RETRIEVAL_MODE`, the LLM client and
    /// the chat service around a loaded knowledge base.
    pub fn build(config: Config, knowledge: KnowledgeBase) -> Result<Self> {
        let knowledge = Arc::new(knowledge);
        let retriever = build_retriever(&config, knowledge.clone())?;
        let llm = LlmStreamClient::new(&config.llm)?;
        let chat = ChatService::new(retriever, llm, config.knowledge.top_k);

        Ok(Self::new(config, knowledge, chat))
    }
}

pub fn build_retriever(
    config: &Config,
    knowledge: Arc<KnowledgeBase>,
) -> Result<Arc<dyn Retriever>> {
    let retriever: Arc<dyn Retriever> = match config.knowledge.retrieval_mode {
        RetrievalMode::Keyword => Arc::new(KeywordRetriever::new(knowledge)),
        RetrievalMode::Semantic => {
            let embeddings = EmbeddingApiClient::new(&config.llm, &config.embeddings)?;
            if !embeddings.is_available() {
                tracing::warn!("Semantic retrieval selected without an API key; keyword search will be used");
            }
            let cache = EmbeddingCache::new(config.embeddings.cache_size);
            Arc::new(SemanticRetriever::new(knowledge, embeddings, cache))
        }
    };

    tracing::info!(retriever = retriever.name(), "Retriever ready");
    Ok(retriever)
}

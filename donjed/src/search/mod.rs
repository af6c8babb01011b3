mod classifier;
mod context;
mod embedding_cache;
mod keyword;
mod retriever;
mod semantic;

pub use classifier::{is_document_query, DOMAIN_KEYWORDS, GREETINGS};
pub use context::build_context;
pub use embedding_cache::EmbeddingCache;
pub use keyword::{keyword_search, KeywordRetriever, DEFAULT_TOP_K, PHRASE_BONUS};
pub use retriever::Retriever;
pub use semantic::{cosine_similarity, SemanticRetriever};

use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::services::DEFAULT_MAX_SESSIONS;

/// Google's OpenAI-compatible surface for Gemini models.
pub const GOOGLE_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

/// Value shipped in `.env.example`; treated the same as an unset key.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GOOGLE_AI_API_KEY";

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// Parse a comma-separated list, dropping blank entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub knowledge: KnowledgeConfig,
    pub processing: ProcessingConfig,
    pub llm: LlmConfig,
    pub embeddings: EmbeddingsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Live chat sessions kept before the least recently used is dropped.
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Keyword,
    Semantic,
}

impl FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "semantic" => Ok(Self::Semantic),
            other => Err(format!("unknown retrieval mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    pub path: String,
    pub top_k: usize,
    pub retrieval_mode: RetrievalMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    pub max_chunk_size: usize,
}

/// LLM configuration for the chat completion endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    /// Primary endpoint base, called with `stream: true`.
    pub base_url: String,
    /// Tried in order, non-streaming, when the primary yields nothing.
    pub fallback_urls: Vec<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Retries on HTTP 429 per endpoint.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Returns the API key unless it is missing, blank or the shipped placeholder.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            base_url: GOOGLE_OPENAI_BASE_URL.to_string(),
            fallback_urls: vec![GOOGLE_OPENAI_BASE_URL.to_string()],
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 8192,
            max_retries: 3,
            backoff_base_ms: 1000,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        let llm_defaults = LlmConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("DONJED_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("DONJED_PORT", 3000),
                cors_origins: env::var("DONJED_CORS_ORIGINS")
                    .map(|origins| parse_list(&origins))
                    .unwrap_or_default(),
                max_sessions: parse_env_or("DONJED_MAX_SESSIONS", DEFAULT_MAX_SESSIONS),
            },
            knowledge: KnowledgeConfig {
                path: env::var("KNOWLEDGE_BASE_PATH")
                    .unwrap_or_else(|_| "knowledge-base.json".to_string()),
                top_k: parse_env_or("RAG_TOP_K", 3),
                retrieval_mode: parse_env_or("RETRIEVAL_MODE", RetrievalMode::Keyword),
            },
            processing: ProcessingConfig {
                max_chunk_size: parse_env_or("CHUNK_SIZE", 1000),
            },
            llm: LlmConfig {
                model: env::var("LLM_MODEL").unwrap_or(llm_defaults.model),
                api_key: env::var("LLM_API_KEY")
                    .or_else(|_| env::var("GOOGLE_API_KEY"))
                    .ok(),
                base_url: env::var("LLM_BASE_URL").unwrap_or(llm_defaults.base_url),
                fallback_urls: env::var("LLM_FALLBACK_URLS")
                    .map(|urls| parse_list(&urls))
                    .unwrap_or(llm_defaults.fallback_urls),
                temperature: parse_env_opt("LLM_TEMPERATURE").unwrap_or(llm_defaults.temperature),
                top_p: parse_env_opt("LLM_TOP_P").unwrap_or(llm_defaults.top_p),
                max_tokens: parse_env_or("LLM_MAX_TOKENS", llm_defaults.max_tokens),
                max_retries: parse_env_or("LLM_MAX_RETRIES", llm_defaults.max_retries),
                backoff_base_ms: parse_env_or("LLM_BACKOFF_BASE_MS", llm_defaults.backoff_base_ms),
                timeout_secs: parse_env_or("LLM_TIMEOUT", llm_defaults.timeout_secs),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-004".to_string()),
                cache_size: parse_env_or("EMBEDDING_CACHE_SIZE", 4096),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

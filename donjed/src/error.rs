use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DonjedError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },
}

impl IntoResponse for DonjedError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DonjedError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            DonjedError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DonjedError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            DonjedError::KnowledgeBase(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            DonjedError::Retrieval(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            DonjedError::Embedding(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            DonjedError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            DonjedError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            DonjedError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            DonjedError::UrlParse(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            DonjedError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            DonjedError::Llm(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            DonjedError::LlmUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            DonjedError::LlmRateLimit { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("LLM rate limit exceeded, retry after {retry_after:?} seconds"),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DonjedError>;

use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DonJed Assistant API",
        version = "1.0.0",
        description = "Retrieval-augmented chat for DonJed Energy Solutions. Replies stream as plain text.",
    ),
    paths(
        handlers::health::health_check,
        handlers::chat::chat,
        handlers::search::search,
        handlers::sessions::get_session,
        handlers::sessions::update_input,
        handlers::sessions::reset_session,
        handlers::sessions::delete_session,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Chat
        dto::chat::ChatRequest,
        // Sessions
        dto::sessions::MessageRole,
        dto::sessions::MessageResponse,
        dto::sessions::SessionResponse,
        dto::sessions::UpdateInputRequest,
        dto::sessions::DeleteSessionResponse,
        // Search
        dto::search::SearchRequest,
        dto::search::SearchResponse,
        dto::search::SearchResultItem,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::KnowledgeStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "chat", description = "Streamed assistant replies"),
        (name = "sessions", description = "Chat transcript, draft input and reset"),
        (name = "search", description = "Knowledge base retrieval"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}

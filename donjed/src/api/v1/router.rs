use axum::{
    routing::{get, post, put},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let sessions = Router::new()
        .route(
            "/{sessionId}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
        .route("/{sessionId}/input", put(handlers::sessions::update_input))
        .route("/{sessionId}/reset", post(handlers::sessions::reset_session));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/chat", post(handlers::chat::chat))
        .route("/search", post(handlers::search::search))
        .nest("/sessions", sessions)
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
}

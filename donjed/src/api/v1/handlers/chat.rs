//! v1 Chat handler.
//!
//! `POST /api/v1/chat` streams the assistant's reply as plain UTF-8 text,
//! fragment by fragment, as the model produces it.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

use crate::api::v1::dto::ChatRequest;
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// Response header carrying the session the turn ran in.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// `POST /api/v1/chat`
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Streamed reply text", content_type = "text/plain", body = String,
            headers(("x-session-id" = String, description = "Session the turn belongs to"))),
        (status = 400, description = "Blank message", body = ApiError),
        (status = 409, description = "A reply is already streaming for this session", body = ApiError),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<ChatRequest>,
) -> Response {
    if req.message.trim().is_empty() {
        return ApiResponse::<()>::error(ErrorCode::InvalidRequest, "Message cannot be empty")
            .into_response();
    }

    // Nothing is stored until the id is known to fit in a response header.
    let (session_id, session_header, session) =
        match req.session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                let Ok(session_header) = HeaderValue::from_str(&id) else {
                    return ApiResponse::<()>::error(ErrorCode::InvalidRequest, "Invalid session id")
                        .into_response();
                };
                let session = state.sessions.get_or_create(&id);
                (id, session_header, session)
            }
            None => {
                let (id, session) = state.sessions.create();
                let Ok(session_header) = HeaderValue::from_str(&id) else {
                    state.sessions.remove(&id);
                    return ApiResponse::<()>::error(ErrorCode::InternalError, "Invalid session id")
                        .into_response();
                };
                (id, session_header, session)
            }
        };

    let turn = match state.chat.submit(&session, &req.message) {
        Ok(turn) => turn,
        Err(e) => return ApiResponse::<()>::from(e).into_response(),
    };

    tracing::info!(session_id, "Chat turn started");

    let body = Body::from_stream(turn.map(Ok::<_, Infallible>));
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        [(SESSION_ID_HEADER, session_header)],
        body,
    )
        .into_response()
}

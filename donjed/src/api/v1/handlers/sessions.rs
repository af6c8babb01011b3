//! v1 Session handlers: inspect, edit the pending input, reset and delete
//! a chat session.

use axum::extract::{Path, State};

use crate::api::v1::dto::{DeleteSessionResponse, SessionResponse, UpdateInputRequest};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::services::lock_session;

fn not_found<T: serde::Serialize>(session_id: &str) -> ApiResponse<T> {
    ApiResponse::error(
        ErrorCode::NotFound,
        format!("Session {session_id} not found"),
    )
}

/// `GET /api/v1/sessions/{sessionId}`
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{sessionId}",
    tag = "sessions",
    params(("sessionId" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session transcript", body = SessionResponse),
        (status = 404, description = "Unknown session", body = ApiError),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResponse<SessionResponse> {
    match state.sessions.get(&session_id) {
        Some(session) => ApiResponse::success(SessionResponse::from(&*lock_session(&session))),
        None => not_found(&session_id),
    }
}

/// `PUT /api/v1/sessions/{sessionId}/input`
///
/// Stores the visitor's unsent draft. Creates the session if needed.
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{sessionId}/input",
    tag = "sessions",
    params(("sessionId" = String, Path, description = "Session id")),
    request_body = UpdateInputRequest,
    responses(
        (status = 200, description = "Updated session", body = SessionResponse),
    )
)]
pub async fn update_input(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    axum::Json(req): axum::Json<UpdateInputRequest>,
) -> ApiResponse<SessionResponse> {
    let session = state.sessions.get_or_create(&session_id);
    let mut session = lock_session(&session);
    session.set_pending_input(req.input);
    ApiResponse::success(SessionResponse::from(&*session))
}

/// `POST /api/v1/sessions/{sessionId}/reset`
///
/// Clears the transcript and pending input and stops any reply in flight.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{sessionId}/reset",
    tag = "sessions",
    params(("sessionId" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session after reset", body = SessionResponse),
        (status = 404, description = "Unknown session", body = ApiError),
    )
)]
pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResponse<SessionResponse> {
    let Some(session) = state.sessions.get(&session_id) else {
        return not_found(&session_id);
    };

    let mut session = lock_session(&session);
    session.reset();
    tracing::info!(session_id, "Session reset");
    ApiResponse::success(SessionResponse::from(&*session))
}

/// `DELETE /api/v1/sessions/{sessionId}`
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{sessionId}",
    tag = "sessions",
    params(("sessionId" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = DeleteSessionResponse),
        (status = 404, description = "Unknown session", body = ApiError),
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResponse<DeleteSessionResponse> {
    let Some(session) = state.sessions.remove(&session_id) else {
        return not_found(&session_id);
    };

    // Stop a reply that may still be streaming into the removed session.
    lock_session(&session).reset();

    ApiResponse::success(DeleteSessionResponse {
        session_id,
        deleted: true,
    })
}

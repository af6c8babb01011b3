//! v1 Search handler.
//!
//! `POST /api/v1/search` runs the retriever directly, bypassing the chat
//! turn, and reports what a turn with the same text would see.

use axum::extract::State;

use crate::api::v1::dto::{SearchRequest, SearchResponse, SearchResultItem, MAX_TOP_K};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::search::{build_context, is_document_query};

/// `POST /api/v1/search`
#[utoipa::path(
    post,
    path = "/api/v1/search",
    tag = "search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn search(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<SearchRequest>,
) -> ApiResponse<SearchResponse> {
    if req.query.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Query cannot be empty");
    }

    let top_k = req
        .top_k
        .unwrap_or_else(|| state.chat.top_k())
        .clamp(1, MAX_TOP_K);

    let results = match state.chat.retriever().search(&req.query, top_k).await {
        Ok(results) => results,
        Err(e) => return e.into(),
    };

    let context = build_context(&results);
    ApiResponse::success(SearchResponse {
        is_document_query: is_document_query(&req.query),
        results: results.into_iter().map(SearchResultItem::from).collect(),
        context,
    })
}

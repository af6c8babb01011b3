use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub knowledge: KnowledgeStatus,
    pub llm: LlmStatus,
    pub sessions: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStatus {
    pub status: String,
    pub documents: usize,
    pub chunks: usize,
    pub generated_at: DateTime<Utc>,
    pub retriever: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LlmStatus {
    /// `configured` or `missing_credential`.
    pub status: String,
    pub model: String,
    pub endpoints: usize,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let knowledge = KnowledgeStatus {
        status: if state.knowledge.is_empty() {
            "empty".to_string()
        } else {
            "ok".to_string()
        },
        documents: state.knowledge.total_documents,
        chunks: state.knowledge.chunks().len(),
        generated_at: state.knowledge.generated_at,
        retriever: state.chat.retriever().name().to_string(),
    };

    let llm = state.chat.llm();
    let llm_status = LlmStatus {
        status: if llm.has_credential() {
            "configured".to_string()
        } else {
            "missing_credential".to_string()
        },
        model: llm.model().to_string(),
        endpoints: llm.endpoints().len(),
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        knowledge,
        llm: llm_status,
        sessions: state.sessions.len(),
    })
}

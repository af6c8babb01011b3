use serde::Deserialize;

/// Body of `POST /api/v1/chat`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Session to continue. A new session is started when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

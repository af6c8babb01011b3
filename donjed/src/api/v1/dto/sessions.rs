use serde::{Deserialize, Serialize};

use crate::models::{ConversationMessage, Role};
use crate::services::ChatSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Bot => Self::Bot,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

impl From<&ConversationMessage> for MessageResponse {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            id: message.id.clone(),
            role: message.role.into(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub messages: Vec<MessageResponse>,
    pub pending_input: String,
    /// True while a reply is streaming.
    pub loading: bool,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            session_id: session.id().to_string(),
            messages: session.messages().iter().map(MessageResponse::from).collect(),
            pending_input: session.pending_input().to_string(),
            loading: session.is_loading(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct UpdateInputRequest {
    pub input: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionResponse {
    pub session_id: String,
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_response_wire_format() {
        let mut session = ChatSession::new("abc");
        session.set_pending_input("how many panels");

        let json = serde_json::to_value(SessionResponse::from(&session)).unwrap();
        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["pendingInput"], "how many panels");
        assert_eq!(json["loading"], false);
        assert_eq!(json["messages"], serde_json::json!([]));
    }

    #[test]
    fn test_message_role_lowercase() {
        let message = ConversationMessage::bot("Hello!");
        let json = serde_json::to_value(MessageResponse::from(&message)).unwrap();
        assert_eq!(json["role"], "bot");
    }
}

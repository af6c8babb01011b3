//! Request and response bodies of the OpenAI-compatible chat completions API.

use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Non-streaming response body.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, if it has any.
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .message?
            .content
            .filter(|content| !content.is_empty())
    }
}

/// One `data:` frame of a streaming response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionChunk {
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .delta?
            .content
            .filter(|content| !content.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;

    #[test]
    fn test_request_wire_format() {
        let messages = vec![ChatMessage::system("persona"), ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "gemini-2.5-flash",
            messages: &messages,
            stream: true,
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 8192,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gemini-2.5-flash");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 8192);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_response_content() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Hello"}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_content().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_response_without_content() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":""}}]}"#,
            r#"{}"#,
        ] {
            let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
            assert!(response.into_content().is_none(), "{body}");
        }
    }

    #[test]
    fn test_chunk_content() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Sun"}}]}"#).unwrap();
        assert_eq!(chunk.into_content().as_deref(), Some("Sun"));

        let role_only: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(role_only.into_content().is_none());
    }
}

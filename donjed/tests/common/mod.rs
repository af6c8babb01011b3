#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use serde_json::json;
use wiremock::ResponseTemplate;

use donjed::config::{Config, LlmConfig};
use donjed::knowledge::KnowledgeBase;
use donjed::llm::{Stage, StageObserver};
use donjed::models::DocumentChunk;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const PRIMARY_PATH: &str = "/primary/chat/completions";
pub const FALLBACK_PATH: &str = "/fallback/chat/completions";
pub const SECOND_FALLBACK_PATH: &str = "/backup/chat/completions";

/// LLM config pointing the primary and one fallback endpoint at `server_uri`.
pub fn llm_config(server_uri: &str) -> LlmConfig {
    LlmConfig {
        model: "gemini-test".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: format!("{server_uri}/primary/"),
        fallback_urls: vec![format!("{server_uri}/fallback")],
        max_retries: 2,
        backoff_base_ms: 1,
        timeout_secs: 5,
        ..LlmConfig::default()
    }
}

pub fn config(server_uri: &str) -> Config {
    let mut config = Config::default();
    config.llm = llm_config(server_uri);
    config.knowledge.top_k = 3;
    config
}

/// One SSE `data:` frame per fragment, then the done marker.
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        body.push_str(&format!(
            "data: {}\n\n",
            json!({"choices": [{"index": 0, "delta": {"content": fragment}}]})
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn sse_response(fragments: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(fragments), "text/event-stream")
}

pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

pub fn completion_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(completion_body(content))
}

pub fn sample_knowledge() -> KnowledgeBase {
    KnowledgeBase::build(vec![
        DocumentChunk::new(
            "products",
            0,
            "DonJed supplies monocrystalline solar panels from 450W to 550W.".to_string(),
            1,
        ),
        DocumentChunk::new(
            "products",
            1,
            "Lithium batteries for home backup come in 5kWh and 10kWh sizes.".to_string(),
            1,
        ),
        DocumentChunk::new(
            "services",
            0,
            "Installation includes a site survey and a five year workmanship warranty."
                .to_string(),
            1,
        ),
    ])
}

/// Keeps every stage the client reports, in order.
#[derive(Default)]
pub struct RecordingObserver {
    stages: Mutex<Vec<Stage>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages.lock().unwrap().clone()
    }
}

impl StageObserver for RecordingObserver {
    fn on_stage(&self, stage: &Stage) {
        self.stages.lock().unwrap().push(stage.clone());
    }
}

/// Parsed JSON bodies of every request the mock server saw.
pub async fn request_bodies(server: &wiremock::MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

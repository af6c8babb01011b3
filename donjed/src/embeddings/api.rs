use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingsConfig, LlmConfig};
use crate::error::{DonjedError, Result};
use crate::llm::{send_with_retry, RetryOutcome, RetryPolicy};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for the `/embeddings` route of the same OpenAI-compatible
/// provider used for chat.
#[derive(Clone)]
pub struct EmbeddingApiClient {
    client: Client,
    url: String,
    model: String,
    headers: Option<HeaderMap>,
    policy: RetryPolicy,
}

impl EmbeddingApiClient {
    pub fn new(llm: &LlmConfig, embeddings: &EmbeddingsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()
            .map_err(|e| DonjedError::Embedding(format!("Failed to create HTTP client: {e}")))?;

        let headers = match llm.credential() {
            Some(api_key) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {api_key}"))
                        .map_err(|e| DonjedError::Embedding(format!("Invalid API key header: {e}")))?,
                );
                Some(headers)
            }
            None => None,
        };

        Ok(Self {
            client,
            url: format!("{}/embeddings", llm.base_url.trim_end_matches('/')),
            model: embeddings.model.clone(),
            headers,
            policy: RetryPolicy::from_config(llm),
        })
    }

    pub fn is_available(&self) -> bool {
        self.headers.is_some()
    }

    /// Embed one text.
    ///
    /// Without a credential this returns an empty vector instead of an
    /// error; callers treat an empty embedding as "unavailable".
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let Some(headers) = &self.headers else {
            return Ok(Vec::new());
        };

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let outcome = send_with_retry(
            &self.policy,
            || {
                self.client
                    .post(&self.url)
                    .headers(headers.clone())
                    .json(&request)
            },
            |attempt, delay| {
                tracing::warn!(
                    retry = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Embedding request rate limited"
                )
            },
        )
        .await?;

        let resp = match outcome {
            RetryOutcome::Response(resp) => resp,
            RetryOutcome::RateLimited { retry_after } => {
                return Err(DonjedError::LlmRateLimit {
                    retry_after: retry_after.map(|d| d.as_secs()),
                })
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DonjedError::Embedding(format!("API error {status}: {body}")));
        }

        let body: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| DonjedError::Embedding(format!("Failed to parse response: {e}")))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| DonjedError::Embedding("No embedding returned".to_string()))
    }
}

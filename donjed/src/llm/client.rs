use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};

use crate::config::LlmConfig;
use crate::error::{DonjedError, Result};
use crate::models::ChatMessage;

use super::endpoint::{endpoints_from_config, LlmEndpoint};
use super::observer::{Stage, StageObserver, TracingObserver};
use super::prompts::{system_message, CONNECTIVITY_PROMPT};
use super::retry::{send_with_retry, RetryOutcome, RetryPolicy};
use super::sse::SseDecoder;
use super::stream::{ReplyEvent, ReplyFailure, ReplyOutcome, ReplySender, ReplyStream};
use super::wire::{ChatCompletionRequest, ChatCompletionResponse};

/// Longest slice of an error body kept in logs and stage reasons.
const ERROR_BODY_PREVIEW: usize = 200;

/// How one endpoint attempt ended.
enum Attempt {
    Delivered { fragments: usize },
    RateLimited,
    Failed(String),
    Cancelled,
}

/// Streaming chat client for OpenAI-compatible endpoints.
///
/// Tries the configured endpoints in order. Each gets its own 429 retry
/// budget; any other failure before the first fragment moves on to the
/// next endpoint.
#[derive(Clone)]
pub struct LlmStreamClient {
    http: Client,
    config: Arc<LlmConfig>,
    headers: HeaderMap,
    endpoints: Arc<[LlmEndpoint]>,
    policy: RetryPolicy,
    observer: Arc<dyn StageObserver>,
}

impl LlmStreamClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DonjedError::Llm(format!("Failed to create LLM HTTP client: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = config.credential() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .map_err(|e| DonjedError::Llm(format!("Invalid API key header: {e}")))?,
            );
        } else {
            tracing::warn!("LLM API key not found or placeholder; replies are disabled");
        }

        let endpoints = endpoints_from_config(config);
        for endpoint in &endpoints {
            url::Url::parse(&endpoint.url)?;
        }

        Ok(Self {
            http,
            config: Arc::new(config.clone()),
            headers,
            endpoints: endpoints.into(),
            policy: RetryPolicy::from_config(config),
            observer: Arc::new(TracingObserver),
        })
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.config.credential().is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoints(&self) -> &[LlmEndpoint] {
        &self.endpoints
    }

    /// System message, then `history` in order, then the user prompt.
    pub fn build_messages(
        prompt: &str,
        context: Option<&str>,
        history: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_message(context)));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(prompt));
        messages
    }

    /// Start a reply. The request runs on a background task; the returned
    /// stream ends with exactly one [`ReplyEvent::Finished`] unless it is
    /// cancelled first.
    pub fn stream_chat(
        &self,
        prompt: &str,
        context: Option<&str>,
        history: &[ChatMessage],
    ) -> ReplyStream {
        if !self.has_credential() {
            let failure = ReplyFailure::MissingCredential;
            self.observer.on_stage(&Stage::Failed { failure });
            return ReplyStream::finished(ReplyOutcome::Failed(failure));
        }

        let messages = Self::build_messages(prompt, context, history);
        let (tx, stream) = ReplyStream::channel();
        let client = self.clone();

        tokio::spawn(async move {
            let cancel = tx.cancellation().clone();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = client.drive(&messages, &tx) => outcome,
            };

            match outcome {
                Some(outcome) => {
                    tx.send(ReplyEvent::Finished(outcome)).await;
                }
                None => tracing::debug!("Reply cancelled by consumer"),
            }
        });

        stream
    }

    /// Whole reply as one string, failure messages included.
    pub async fn complete(
        &self,
        prompt: &str,
        context: Option<&str>,
        history: &[ChatMessage],
    ) -> String {
        self.stream_chat(prompt, context, history)
            .collect_text()
            .await
    }

    /// Send a one-line prompt to the primary endpoint without streaming and
    /// return the model's answer.
    pub async fn check_connectivity(&self) -> Result<String> {
        if !self.has_credential() {
            return Err(DonjedError::LlmUnavailable(
                "LLM API key is missing or still the placeholder".to_string(),
            ));
        }

        let endpoint = &self.endpoints[0];
        let messages = [ChatMessage::user(CONNECTIVITY_PROMPT)];
        let request = self.request_body(&messages, false);

        let response = self
            .http
            .post(&endpoint.url)
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(DonjedError::LlmRateLimit { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DonjedError::Llm(format!(
                "API returned {status}: {}",
                preview(&body)
            )));
        }

        let body: ChatCompletionResponse = response.json().await?;
        body.into_content()
            .ok_or_else(|| DonjedError::Llm("Response contained no content".to_string()))
    }

    fn request_body<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        stream: bool,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            stream,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Walk the endpoint chain. `None` means the consumer went away.
    async fn drive(&self, messages: &[ChatMessage], tx: &ReplySender) -> Option<ReplyOutcome> {
        let mut previous: Option<(&LlmEndpoint, String)> = None;

        for endpoint in self.endpoints.iter() {
            if let Some((from, reason)) = previous.take() {
                self.observer.on_stage(&Stage::FallbackEngaged {
                    from: from.url.clone(),
                    to: endpoint.url.clone(),
                    reason,
                });
            }

            match self.attempt(endpoint, messages, tx).await {
                Attempt::Delivered { fragments } => {
                    self.observer.on_stage(&Stage::Completed {
                        endpoint: endpoint.url.clone(),
                        fragments,
                    });
                    return Some(ReplyOutcome::Completed {
                        endpoint: endpoint.url.clone(),
                    });
                }
                Attempt::RateLimited => {
                    return Some(self.fail(ReplyFailure::RateLimited));
                }
                Attempt::Failed(reason) => {
                    tracing::warn!(endpoint = %endpoint.url, reason, "Endpoint attempt failed");
                    previous = Some((endpoint, reason));
                }
                Attempt::Cancelled => return None,
            }
        }

        Some(self.fail(ReplyFailure::Exhausted))
    }

    fn fail(&self, failure: ReplyFailure) -> ReplyOutcome {
        self.observer.on_stage(&Stage::Failed { failure });
        ReplyOutcome::Failed(failure)
    }

    async fn attempt(
        &self,
        endpoint: &LlmEndpoint,
        messages: &[ChatMessage],
        tx: &ReplySender,
    ) -> Attempt {
        let streaming = endpoint.is_streaming();
        let request = self.request_body(messages, streaming);

        self.observer.on_stage(&Stage::RequestStarted {
            endpoint: endpoint.url.clone(),
            streaming,
        });

        let sent = send_with_retry(
            &self.policy,
            || {
                self.http
                    .post(&endpoint.url)
                    .headers(self.headers.clone())
                    .json(&request)
            },
            |attempt, delay| {
                self.observer.on_stage(&Stage::RetryScheduled {
                    endpoint: endpoint.url.clone(),
                    attempt,
                    delay,
                })
            },
        )
        .await;

        let response = match sent {
            Ok(RetryOutcome::Response(response)) => response,
            Ok(RetryOutcome::RateLimited { .. }) => {
                self.observer.on_stage(&Stage::ResponseStatus {
                    endpoint: endpoint.url.clone(),
                    status: reqwest::StatusCode::TOO_MANY_REQUESTS.as_u16(),
                });
                return Attempt::RateLimited;
            }
            Err(e) => return Attempt::Failed(format!("request failed: {e}")),
        };

        let status = response.status();
        self.observer.on_stage(&Stage::ResponseStatus {
            endpoint: endpoint.url.clone(),
            status: status.as_u16(),
        });

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Failed(format!("API returned {status}: {}", preview(&body)));
        }

        if streaming {
            self.read_stream(endpoint, response, tx).await
        } else {
            Self::read_whole(response, tx).await
        }
    }

    async fn read_stream(
        &self,
        endpoint: &LlmEndpoint,
        response: Response,
        tx: &ReplySender,
    ) -> Attempt {
        let mut decoder = SseDecoder::new();
        let mut fragments = 0usize;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) if fragments > 0 => {
                    // Text already reached the user; replaying elsewhere would duplicate it.
                    self.observer.on_stage(&Stage::StreamInterrupted {
                        endpoint: endpoint.url.clone(),
                        fragments,
                        error: e.to_string(),
                    });
                    return Attempt::Delivered { fragments };
                }
                Err(e) => return Attempt::Failed(format!("stream read failed: {e}")),
            };

            for fragment in decoder.push(&bytes) {
                if !tx.send(ReplyEvent::Delta(fragment)).await {
                    return Attempt::Cancelled;
                }
                fragments += 1;
            }
        }

        if let Some(fragment) = decoder.finish() {
            if !tx.send(ReplyEvent::Delta(fragment)).await {
                return Attempt::Cancelled;
            }
            fragments += 1;
        }

        if fragments == 0 {
            return Attempt::Failed("streaming yielded no content".to_string());
        }
        Attempt::Delivered { fragments }
    }

    async fn read_whole(response: Response, tx: &ReplySender) -> Attempt {
        let body: ChatCompletionResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => return Attempt::Failed(format!("invalid response body: {e}")),
        };

        let Some(content) = body.into_content() else {
            return Attempt::Failed("no content in response".to_string());
        };

        if !tx.send(ReplyEvent::Delta(content)).await {
            return Attempt::Cancelled;
        }
        Attempt::Delivered { fragments: 1 }
    }
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

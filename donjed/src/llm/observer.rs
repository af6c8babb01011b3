use std::time::Duration;

use super::ReplyFailure;

/// Progress of one reply through the endpoint chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    RequestStarted { endpoint: String, streaming: bool },
    ResponseStatus { endpoint: String, status: u16 },
    RetryScheduled { endpoint: String, attempt: u32, delay: Duration },
    FallbackEngaged { from: String, to: String, reason: String },
    StreamInterrupted { endpoint: String, fragments: usize, error: String },
    Completed { endpoint: String, fragments: usize },
    Failed { failure: ReplyFailure },
}

/// Receives every [`Stage`] the streaming client passes through.
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, stage: &Stage);
}

/// Default observer: one structured log line per stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_stage(&self, stage: &Stage) {
        match stage {
            Stage::RequestStarted {
                endpoint,
                streaming,
            } => tracing::info!(endpoint, streaming, "Sending chat completion request"),
            Stage::ResponseStatus { endpoint, status } => {
                tracing::info!(endpoint, status, "Chat completion response")
            }
            Stage::RetryScheduled {
                endpoint,
                attempt,
                delay,
            } => tracing::warn!(
                endpoint,
                retry = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, waiting before retry"
            ),
            Stage::FallbackEngaged { from, to, reason } => {
                tracing::warn!(from, to, reason, "Falling back to next endpoint")
            }
            Stage::StreamInterrupted {
                endpoint,
                fragments,
                error,
            } => tracing::warn!(
                endpoint,
                fragments,
                error,
                "Stream interrupted after partial reply"
            ),
            Stage::Completed {
                endpoint,
                fragments,
            } => tracing::info!(endpoint, fragments, "Reply completed"),
            Stage::Failed { failure } => tracing::error!(?failure, "Reply failed"),
        }
    }
}

mod client;
mod endpoint;
mod observer;
pub mod prompts;
mod retry;
mod sse;
mod stream;
mod wire;

pub use client::LlmStreamClient;
pub use endpoint::{endpoints_from_config, EndpointMode, LlmEndpoint};
pub use observer::{Stage, StageObserver, TracingObserver};
pub use retry::{provider_retry_delay, send_with_retry, RetryOutcome, RetryPolicy};
pub use sse::{decode_line, SseDecoder};
pub use stream::{ReplyEvent, ReplyFailure, ReplyOutcome, ReplyStream};

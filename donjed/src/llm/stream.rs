use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why a reply ended without an answer from the model.
///
/// The display text is the user-facing message shown in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReplyFailure {
    #[error("I cannot reply because the LLM API key is missing. Please check your configuration.")]
    MissingCredential,

    #[error("Oops! Due to high traffic, I am currently unavailable. Please try again later.")]
    RateLimited,

    #[error("I'm sorry, I'm having trouble connecting to the AI service right now. Please try again.")]
    Exhausted,
}

impl ReplyFailure {
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// At least one fragment was delivered from `endpoint`.
    Completed { endpoint: String },
    Failed(ReplyFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Delta(String),
    /// Always the last event of a stream that was not cancelled.
    Finished(ReplyOutcome),
}

const CHANNEL_CAPACITY: usize = 32;

/// Producer half of a [`ReplyStream`].
pub(crate) struct ReplySender {
    tx: mpsc::Sender<ReplyEvent>,
    cancel: CancellationToken,
}

impl ReplySender {
    /// Deliver an event. Returns `false` once the consumer is gone or has
    /// cancelled, after which the producer should stop.
    pub async fn send(&self, event: ReplyEvent) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A single model reply as an ordered, finite sequence of events.
///
/// Dropping the stream or calling [`ReplyStream::cancel`] stops the
/// producer and closes the underlying HTTP response.
pub struct ReplyStream {
    rx: mpsc::Receiver<ReplyEvent>,
    cancel: CancellationToken,
}

impl ReplyStream {
    pub(crate) fn channel() -> (ReplySender, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        (
            ReplySender {
                tx,
                cancel: cancel.clone(),
            },
            Self { rx, cancel },
        )
    }

    /// A stream holding only its terminal event.
    pub fn finished(outcome: ReplyOutcome) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity one and a fresh channel: this cannot fail.
        let _ = tx.try_send(ReplyEvent::Finished(outcome));
        Self {
            rx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<ReplyEvent> {
        self.rx.recv().await
    }

    /// Fold the reply into the text a user would see: every delta, then
    /// the failure message if the reply failed.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(event) = self.next_event().await {
            match event {
                ReplyEvent::Delta(fragment) => text.push_str(&fragment),
                ReplyEvent::Finished(ReplyOutcome::Failed(failure)) => {
                    text.push_str(&failure.user_message());
                }
                ReplyEvent::Finished(ReplyOutcome::Completed { .. }) => {}
            }
        }
        text
    }
}

impl Stream for ReplyStream {
    type Item = ReplyEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ReplyStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

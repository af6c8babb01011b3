use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::Result;
use crate::llm::{LlmStreamClient, ReplyEvent, ReplyOutcome};
use crate::models::RagContext;
use crate::search::{build_context, is_document_query, Retriever};

use super::session::{lock_session, SharedSession, TurnState, TurnTicket};

/// Shown when a reply stops without a terminal event.
pub const GENERIC_APOLOGY: &str = "Sorry, something went wrong. Please try again.";

/// Reply text fragments in arrival order.
pub type TurnStream = BoxStream<'static, String>;

/// Runs one chat turn: classify, retrieve, assemble, generate.
#[derive(Clone)]
pub struct ChatService {
    retriever: Arc<dyn Retriever>,
    llm: LlmStreamClient,
    top_k: usize,
}

impl ChatService {
    pub fn new(retriever: Arc<dyn Retriever>, llm: LlmStreamClient, top_k: usize) -> Self {
        Self {
            retriever,
            llm,
            top_k,
        }
    }

    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    pub fn llm(&self) -> &LlmStreamClient {
        &self.llm
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Documentation context for `text`. Small talk skips retrieval, and a
    /// failing retriever counts as no context.
    pub async fn query_rag(&self, text: &str) -> RagContext {
        if !is_document_query(text) {
            tracing::debug!("Query classified as conversational, skipping retrieval");
            return RagContext::empty();
        }

        match self.retriever.search(text, self.top_k).await {
            Ok(results) => {
                tracing::info!(
                    retriever = self.retriever.name(),
                    hits = results.len(),
                    "Retrieved documentation context"
                );
                RagContext {
                    context: build_context(&results),
                    has_context: !results.is_empty(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, continuing without context");
                RagContext::empty()
            }
        }
    }

    /// Start a turn on `session`.
    ///
    /// The user message and bot placeholder are appended before this
    /// returns; retrieval and generation run as the stream is polled. The
    /// placeholder always holds the text yielded so far. Dropping the
    /// stream cancels generation and clears the loading flag.
    pub fn submit(&self, session: &SharedSession, text: &str) -> Result<TurnStream> {
        let ticket = lock_session(session).begin_turn(text)?;
        let TurnTicket {
            generation,
            bot_index,
            history,
            cancel,
        } = ticket;

        let guard = TurnGuard {
            session: session.clone(),
            generation,
            bot_index,
        };
        let service = self.clone();
        let text = text.to_string();

        let stream = async_stream::stream! {
            let guard = guard;
            let rag = service.query_rag(&text).await;
            let context = rag.has_context.then_some(rag.context.as_str());
            let mut reply = service.llm.stream_chat(&text, context, &history);

            let mut accumulated = String::new();
            let mut terminated = false;

            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => {
                        terminated = true;
                        None
                    }
                    event = reply.next_event() => event,
                };

                match event {
                    Some(ReplyEvent::Delta(fragment)) => {
                        accumulated.push_str(&fragment);
                        if !guard.apply(&accumulated, TurnState::Streaming) {
                            terminated = true;
                            break;
                        }
                        yield fragment;
                    }
                    Some(ReplyEvent::Finished(ReplyOutcome::Completed { .. })) => {
                        guard.apply(&accumulated, TurnState::Complete);
                        terminated = true;
                        break;
                    }
                    Some(ReplyEvent::Finished(ReplyOutcome::Failed(failure))) => {
                        let message = failure.user_message();
                        accumulated.push_str(&message);
                        if guard.apply(&accumulated, TurnState::Failed) {
                            yield message;
                        }
                        terminated = true;
                        break;
                    }
                    None => break,
                }
            }

            if !terminated {
                tracing::error!("Reply ended without a terminal event");
                if guard.apply(GENERIC_APOLOGY, TurnState::Failed) {
                    yield GENERIC_APOLOGY.to_string();
                }
            }
        };

        Ok(stream.boxed())
    }

    /// Run a turn to completion and return the full reply text.
    pub async fn submit_and_collect(&self, session: &SharedSession, text: &str) -> Result<String> {
        let stream = self.submit(session, text)?;
        Ok(stream.collect::<Vec<_>>().await.concat())
    }
}

/// Writes turn progress into the session and releases it on drop.
struct TurnGuard {
    session: SharedSession,
    generation: u64,
    bot_index: usize,
}

impl TurnGuard {
    fn apply(&self, content: &str, state: TurnState) -> bool {
        lock_session(&self.session).apply_reply(self.generation, self.bot_index, content, state)
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        lock_session(&self.session).end_turn(self.generation);
    }
}

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;

use tokio_util::sync::CancellationToken;

use crate::error::{DonjedError, Result};
use crate::models::{ChatMessage, ConversationMessage};

/// Where the current turn of a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    UserMessageAppended,
    BotPlaceholderAppended,
    Streaming,
    Complete,
    Failed,
}

/// Everything a turn needs once the session has accepted it.
#[derive(Debug)]
pub(crate) struct TurnTicket {
    pub generation: u64,
    pub bot_index: usize,
    pub history: Vec<ChatMessage>,
    pub cancel: CancellationToken,
}

/// One visitor's conversation with the assistant.
#[derive(Debug, Default)]
pub struct ChatSession {
    id: String,
    messages: Vec<ConversationMessage>,
    pending_input: String,
    loading: bool,
    state: TurnState,
    generation: u64,
    turn_cancel: Option<CancellationToken>,
}

pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Lock a session, recovering the data if a previous holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, ChatSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, input: impl Into<String>) {
        self.pending_input = input.into();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop the transcript and pending input. A turn still streaming is
    /// cancelled and can no longer touch this session.
    pub fn reset(&mut self) {
        if let Some(cancel) = self.turn_cancel.take() {
            cancel.cancel();
        }
        self.messages.clear();
        self.pending_input.clear();
        self.loading = false;
        self.state = TurnState::Idle;
        self.generation += 1;
        tracing::debug!(session_id = %self.id, generation = self.generation, "Session reset");
    }

    /// Append the user message and an empty bot placeholder.
    ///
    /// History for the model is taken before either is appended and skips
    /// blank entries.
    pub(crate) fn begin_turn(&mut self, text: &str) -> Result<TurnTicket> {
        if text.trim().is_empty() {
            return Err(DonjedError::Validation("Message cannot be empty".to_string()));
        }
        if self.loading {
            return Err(DonjedError::Conflict(
                "A reply is already streaming for this session".to_string(),
            ));
        }

        let history = self
            .messages
            .iter()
            .filter(|message| !message.content.trim().is_empty())
            .map(ChatMessage::from)
            .collect();

        self.messages.push(ConversationMessage::user(text));
        self.transition(TurnState::UserMessageAppended);

        self.messages.push(ConversationMessage::bot(""));
        self.transition(TurnState::BotPlaceholderAppended);

        self.loading = true;
        self.pending_input.clear();

        let cancel = CancellationToken::new();
        self.turn_cancel = Some(cancel.clone());

        Ok(TurnTicket {
            generation: self.generation,
            bot_index: self.messages.len() - 1,
            history,
            cancel,
        })
    }

    /// Replace the placeholder content. Returns `false` if the session was
    /// reset since the turn began, in which case nothing changes.
    pub(crate) fn apply_reply(
        &mut self,
        generation: u64,
        bot_index: usize,
        content: &str,
        state: TurnState,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        let Some(message) = self.messages.get_mut(bot_index) else {
            return false;
        };
        message.content.clear();
        message.content.push_str(content);
        if self.state != state {
            self.transition(state);
        }
        true
    }

    pub(crate) fn end_turn(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        self.loading = false;
        self.turn_cancel = None;
        self.transition(TurnState::Idle);
    }

    fn transition(&mut self, next: TurnState) {
        tracing::debug!(session_id = %self.id, from = ?self.state, to = ?next, "Turn state");
        self.state = next;
    }
}

/// Sessions kept when no limit is configured.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// In-memory registry of live sessions.
///
/// Bounded: once full, the least recently touched session is dropped. A
/// turn still streaming into an evicted session finishes on its own handle.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, SharedSession>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `capacity` sessions. Zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get_or_create(&self, id: &str) -> SharedSession {
        let mut sessions = self.lock();
        if let Some(session) = sessions.get(id) {
            return session.clone();
        }

        let session = Arc::new(Mutex::new(ChatSession::new(id)));
        if let Some((evicted, _)) = sessions.push(id.to_string(), session.clone()) {
            tracing::debug!(session_id = %evicted, "Evicted least recently used session");
        }
        session
    }

    /// Start a session under a fresh id.
    pub fn create(&self) -> (String, SharedSession) {
        let id = nanoid::nanoid!();
        let session = self.get_or_create(&id);
        (id, session)
    }

    pub fn get(&self, id: &str) -> Option<SharedSession> {
        self.lock().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<SharedSession> {
        self.lock().pop(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, SharedSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatRole, Role};

    #[test]
    fn test_begin_turn_appends_user_and_placeholder() {
        let mut session = ChatSession::new("s1");
        session.set_pending_input("draft");

        let ticket = session.begin_turn("What does a 5kVA system cost?").unwrap();

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.messages()[1].role, Role::Bot);
        assert_eq!(session.messages()[1].content, "");
        assert_eq!(ticket.bot_index, 1);
        assert!(ticket.history.is_empty());
        assert!(session.is_loading());
        assert_eq!(session.pending_input(), "");
        assert_eq!(session.state(), TurnState::BotPlaceholderAppended);
    }

    #[test]
    fn test_blank_message_rejected() {
        let mut session = ChatSession::new("s1");
        let err = session.begin_turn("   \n").unwrap_err();
        assert!(matches!(err, DonjedError::Validation(_)));
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_second_turn_while_loading_conflicts() {
        let mut session = ChatSession::new("s1");
        session.begin_turn("first").unwrap();

        let err = session.begin_turn("second").unwrap_err();
        assert!(matches!(err, DonjedError::Conflict(_)));
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_history_skips_blank_messages() {
        let mut session = ChatSession::new("s1");
        let first = session.begin_turn("hello").unwrap();
        session.end_turn(first.generation);

        let second = session.begin_turn("what about batteries?").unwrap();
        assert_eq!(second.history, vec![ChatMessage::user("hello")]);
        assert_eq!(second.history[0].role, ChatRole::User);
    }

    #[test]
    fn test_apply_reply_replaces_content() {
        let mut session = ChatSession::new("s1");
        let ticket = session.begin_turn("hi").unwrap();

        assert!(session.apply_reply(ticket.generation, ticket.bot_index, "Hel", TurnState::Streaming));
        assert!(session.apply_reply(ticket.generation, ticket.bot_index, "Hello", TurnState::Streaming));
        assert_eq!(session.messages()[1].content, "Hello");

        session.end_turn(ticket.generation);
        assert!(!session.is_loading());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[test]
    fn test_reset_clears_everything_and_fences_old_turn() {
        let mut session = ChatSession::new("s1");
        let first = session.begin_turn("one").unwrap();
        session.apply_reply(first.generation, first.bot_index, "reply one", TurnState::Complete);
        session.end_turn(first.generation);
        let second = session.begin_turn("two").unwrap();
        session.set_pending_input("three");
        assert_eq!(session.messages().len(), 4);

        session.reset();

        assert!(session.messages().is_empty());
        assert_eq!(session.pending_input(), "");
        assert!(!session.is_loading());
        assert!(second.cancel.is_cancelled());
        assert!(!session.apply_reply(second.generation, second.bot_index, "late", TurnState::Streaming));
        assert!(session.messages().is_empty());

        // A stale end_turn must not disturb a newer turn.
        let third = session.begin_turn("four").unwrap();
        session.end_turn(second.generation);
        assert!(session.is_loading());
        session.end_turn(third.generation);
        assert!(!session.is_loading());
    }

    #[test]
    fn test_store_get_or_create_is_idempotent() {
        let store = SessionStore::new();
        let a = store.get_or_create("abc");
        let b = store.get_or_create("abc");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);

        let (id, _) = store.create();
        assert!(store.get(&id).is_some());
        assert!(store.remove("abc").is_some());
        assert!(store.get("abc").is_none());
    }

    #[test]
    fn test_store_evicts_least_recently_used_session() {
        let store = SessionStore::with_capacity(2);
        let first = store.get_or_create("first");
        store.get_or_create("second");

        // Touching "first" makes "second" the eviction candidate.
        assert!(store.get("first").is_some());
        store.get_or_create("third");

        assert_eq!(store.len(), 2);
        assert!(store.get("second").is_none());
        assert!(Arc::ptr_eq(&store.get("first").unwrap(), &first));
        assert!(store.get("third").is_some());
    }

    #[test]
    fn test_store_zero_capacity_holds_one_session() {
        let store = SessionStore::with_capacity(0);
        assert_eq!(store.capacity(), 1);
        store.create();
        store.create();
        assert_eq!(store.len(), 1);
    }
}

mod chat;
mod session;

pub use chat::{ChatService, TurnStream, GENERIC_APOLOGY};
pub use session::{
    lock_session, ChatSession, SessionStore, SharedSession, TurnState, DEFAULT_MAX_SESSIONS,
};

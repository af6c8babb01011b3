//! v1 API Data Transfer Objects.
//!
//! Wire types for the v1 REST API, kept apart from the domain models in
//! `src/models/`.

pub mod chat;
pub mod search;
pub mod sessions;

pub use chat::*;
pub use search::*;
pub use sessions::*;

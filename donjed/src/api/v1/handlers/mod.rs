pub mod chat;
pub(crate) mod health;
pub mod search;
pub mod sessions;

pub use health::health_check;

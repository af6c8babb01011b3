//! DonJed assistant backend.
//!
//! A chat turn flows classifier → retriever → context assembler → streaming
//! LLM client, orchestrated by [`services::ChatService`] and served over
//! HTTP by [`api::create_router`].

pub mod api;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod processing;
pub mod search;
pub mod services;

pub use error::{DonjedError, Result};

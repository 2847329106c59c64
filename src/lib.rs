//! ragchat: chat with your own documents
//!
//! Documents are split into chunks, embedded into PostgreSQL/pgvector and
//! retrieved by cosine similarity to ground answers from an OpenAI-compatible
//! completion API. Answers are served over REST, optionally streamed as SSE.

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod database;
pub mod documents;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;
pub mod sse;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod models_tests;

#[cfg(test)]
pub mod tests;

pub use config::AppConfig;
pub use errors::*;

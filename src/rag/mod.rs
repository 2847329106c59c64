//! RAG (Retrieval-Augmented Generation) module
//!
//! This module answers questions over a user's documents:
//! - Semantic retrieval of chunks using vector embeddings
//! - Context assembly from retrieved chunks, bounded by a character budget
//! - LLM-based answer generation, whole or streamed
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ragchat::config::AppConfig;
//! use ragchat::database::Database;
//! use ragchat::rag::RagService;
//! use ragchat::rag::RetrievalOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let database = Arc::new(Database::from_config(&config).await?);
//!     let service = RagService::new(&config, database)?;
//!
//!     let user_id = uuid::Uuid::new_v4();
//!     let options = RetrievalOptions::default();
//!     let response = service.answer(user_id, "How many vacation days?", &[], &options).await?;
//!     println!("Answer: {}", response.answer);
//!     println!("Sources: {} chunks", response.sources.len());
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod pipeline;
pub mod retriever;

pub use context::ContextAssembler;
pub use pipeline::RagResponse;
pub use pipeline::RagService;
pub use pipeline::RagStream;
pub use retriever::RetrievalOptions;
pub use retriever::Retriever;

/// Chunk returned by retrieval, with its cosine similarity to the question
pub type RetrievedChunk = crate::models::ChunkMatch;

//! Embeddings generation module
//!
//! This module provides functionality for generating text embeddings using a
//! hosted API:
//! - OpenAI (text-embedding-3-small, etc.) or any OpenAI-compatible endpoint
//! - Ollama (local models)
//!
//! # Examples
//!
//! ```rust,no_run
//! use ragchat::embeddings::EmbeddingService;
//! use ragchat::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = EmbeddingService::new(&config)?;
//!
//!     let embedding = service.generate("Hello, world!").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod generator;
pub mod text_preprocessing;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use generator::EmbeddingService;
pub use text_preprocessing::preprocess_text_for_embedding;

use crate::errors::Result;

/// Maximum batch size for embedding generation
pub const MAX_BATCH_SIZE: usize = 100;

/// Configuration for embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl EmbeddingConfig {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Result<Self> {
        let provider: EmbeddingProvider = config.embeddings.provider.parse()?;

        // OpenAI-compatible embeddings fall back to the completion API key
        let api_key = config
            .embeddings
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                (provider == EmbeddingProvider::OpenAI && !config.llm.api_key.is_empty())
                    .then(|| config.llm.api_key.clone())
            });

        Ok(Self {
            provider,
            model: config.embedding_model().to_string(),
            dimension: config.embedding_dimension(),
            endpoint: config.embeddings.endpoint.clone(),
            api_key,
        })
    }
}

//! Embedding generation service with preprocessing and batch processing

use std::sync::Arc;

use tracing::info;

use super::client::EmbeddingClient;
use super::EmbeddingConfig;
use super::MAX_BATCH_SIZE;
use crate::embeddings::preprocess_text_for_embedding;
use crate::errors::RagChatError;
use crate::errors::Result;

/// Service for generating embeddings with input cleanup and dimension checks
pub struct EmbeddingService {
    client: Arc<EmbeddingClient>,
    config: EmbeddingConfig,
}

impl EmbeddingService {
    /// Create a new embedding service
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        Self::from_config(EmbeddingConfig::from_app_config(config)?)
    }

    /// Create from custom config
    pub fn from_config(config: EmbeddingConfig) -> Result<Self> {
        let client = EmbeddingClient::from_config(&config)?;

        info!(
            "Embedding service ready: provider={:?}, model={}, dimension={}",
            config.provider, config.model, config.dimension
        );

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    pub const fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Generate embedding for a single text
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let processed_text = preprocess_text_for_embedding(text)?;

        let embedding = self.client.embed(&processed_text).await?;
        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    /// Generate embeddings for multiple texts in batch, preserving order
    ///
    /// Every input must survive preprocessing; a blank entry is rejected
    /// rather than silently embedded as a zero vector.
    pub async fn generate_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let processed_texts = texts
            .iter()
            .map(|text| preprocess_text_for_embedding(text))
            .collect::<Result<Vec<String>>>()?;

        let mut all_embeddings = Vec::with_capacity(processed_texts.len());
        for chunk in processed_texts.chunks(MAX_BATCH_SIZE) {
            let batch: Vec<&str> = chunk.iter().map(String::as_str).collect();
            let chunk_embeddings = self.client.embed_batch(&batch).await?;
            all_embeddings.extend(chunk_embeddings);
        }

        for embedding in &all_embeddings {
            self.check_dimension(embedding)?;
        }

        Ok(all_embeddings)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.config.dimension {
            return Err(RagChatError::EmbeddingError(format!(
                "Model returned {} dimensions, configured dimension is {}",
                embedding.len(),
                self.config.dimension
            )));
        }
        Ok(())
    }
}

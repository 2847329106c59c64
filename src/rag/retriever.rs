//! Semantic retrieval over a user's document chunks

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::database::Database;
use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::models::ConversationSettings;
use crate::rag::RetrievedChunk;

/// How many chunks to fetch and which ones qualify
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub threshold: f32,
    /// Restrict retrieval to these documents; `None` searches all of them
    pub document_ids: Option<Vec<Uuid>>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self::from(&ConversationSettings::default())
    }
}

impl From<&ConversationSettings> for RetrievalOptions {
    fn from(settings: &ConversationSettings) -> Self {
        Self {
            top_k: settings.top_k,
            threshold: settings.threshold,
            document_ids: settings.document_ids.clone(),
        }
    }
}

/// Retriever for semantic search
pub struct Retriever {
    database: Arc<Database>,
    embedding_service: Arc<EmbeddingService>,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(database: Arc<Database>, embedding_service: Arc<EmbeddingService>) -> Self {
        Self {
            database,
            embedding_service,
        }
    }

    /// Embed the question and return the most similar chunks owned by `user_id`
    ///
    /// Results are ordered by descending similarity and never fall below
    /// `options.threshold`. An empty document filter matches nothing.
    pub async fn retrieve(
        &self,
        user_id: Uuid,
        question: &str,
        options: &RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>> {
        if matches!(&options.document_ids, Some(ids) if ids.is_empty()) {
            debug!("Empty document filter, skipping retrieval");
            return Ok(Vec::new());
        }

        debug!(
            "Performing semantic search: top_k={}, threshold={}",
            options.top_k, options.threshold
        );

        let query_embedding = self.embedding_service.generate(question).await?;

        let chunks = self
            .database
            .search_chunks(
                user_id,
                query_embedding,
                options.top_k,
                options.threshold,
                options.document_ids.as_deref(),
            )
            .await?;

        debug!("Retrieved {} chunks", chunks.len());
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_settings() {
        let id = Uuid::new_v4();
        let settings = ConversationSettings {
            top_k: 3,
            threshold: 0.5,
            document_ids: Some(vec![id]),
        };
        let options = RetrievalOptions::from(&settings);
        assert_eq!(options.top_k, 3);
        assert!((options.threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(options.document_ids, Some(vec![id]));
    }

    #[test]
    fn test_default_options_match_default_settings() {
        let options = RetrievalOptions::default();
        assert_eq!(options.top_k, 5);
        assert!((options.threshold - 0.7).abs() < f32::EPSILON);
        assert!(options.document_ids.is_none());
    }
}

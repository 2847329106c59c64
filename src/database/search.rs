use pgvector::Vector;
use uuid::Uuid;

use super::Database;
use crate::models::ChunkMatch;
use crate::RagChatError;
use crate::Result;

impl Database {
    /// Cosine-similarity search over a user's document chunks
    ///
    /// `similarity = 1 - cosine_distance`. Chunks below `threshold` are
    /// excluded; the rest are ordered nearest first and capped at `top_k`.
    /// `document_ids` restricts the search when present.
    pub async fn search_chunks(
        &self,
        user_id: Uuid,
        query_embedding: Vec<f32>,
        top_k: usize,
        threshold: f32,
        document_ids: Option<&[Uuid]>,
    ) -> Result<Vec<ChunkMatch>> {
        if query_embedding.len() != self.embedding_dimension {
            return Err(RagChatError::EmbeddingError(format!(
                "query embedding has {} dimensions, expected {}",
                query_embedding.len(),
                self.embedding_dimension
            )));
        }

        let matches = sqlx::query_as::<_, ChunkMatch>(
            r"
            SELECT
                c.id AS chunk_id,
                c.document_id,
                d.title AS document_title,
                c.content,
                (1 - (c.embedding <=> $1))::FLOAT8 AS similarity
            FROM document_chunks c
            INNER JOIN documents d ON d.id = c.document_id
            WHERE d.user_id = $2
                AND c.embedding IS NOT NULL
                AND ($3::uuid[] IS NULL OR c.document_id = ANY($3))
                AND 1 - (c.embedding <=> $1) >= $4
            ORDER BY c.embedding <=> $1
            LIMIT $5
            ",
        )
        .bind(Vector::from(query_embedding))
        .bind(user_id)
        .bind(document_ids)
        .bind(f64::from(threshold))
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            "Chunk search returned {} matches (top_k={}, threshold={})",
            matches.len(),
            top_k,
            threshold
        );

        Ok(matches)
    }
}

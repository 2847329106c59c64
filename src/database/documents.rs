use pgvector::Vector;
use sqlx::types::Json;
use uuid::Uuid;

use super::Database;
use crate::models::Document;
use crate::models::DocumentChunk;
use crate::models::DocumentStats;
use crate::models::NewChunk;
use crate::models::NewDocument;
use crate::models::PendingChunk;
use crate::Result;

impl Database {
    /// Insert a document and all of its chunks in one transaction
    ///
    /// `chunk_count` is written from `chunks.len()`.
    pub async fn create_document_with_chunks(
        &self,
        user_id: Uuid,
        document: NewDocument,
        chunks: Vec<NewChunk>,
    ) -> Result<Document> {
        let chunk_count = chunks.len() as i32;
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Document>(
            r"
            INSERT INTO documents (id, user_id, title, filename, mime_type, size, content, chunk_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(document.title)
        .bind(document.filename)
        .bind(document.mime_type)
        .bind(document.size)
        .bind(document.content)
        .bind(chunk_count)
        .fetch_one(&mut *tx)
        .await?;

        for chunk in chunks {
            sqlx::query(
                r"
                INSERT INTO document_chunks
                (id, document_id, chunk_index, content, token_count, embedding, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(created.id)
            .bind(chunk.chunk_index as i32)
            .bind(chunk.content)
            .bind(chunk.token_count as i32)
            .bind(chunk.embedding.map(Vector::from))
            .bind(Json(chunk.metadata))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// List a user's documents, newest first
    pub async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    pub async fn get_document(&self, user_id: Uuid, id: Uuid) -> Result<Option<Document>> {
        let document =
            sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(document)
    }

    /// Chunks of a document in order
    pub async fn list_chunks(&self, document_id: Uuid) -> Result<Vec<DocumentChunk>> {
        let chunks = sqlx::query_as::<_, DocumentChunk>(
            "SELECT * FROM document_chunks WHERE document_id = $1 ORDER BY chunk_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(chunks)
    }

    /// Delete a document; its chunks go with it
    pub async fn delete_document(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Chunks still waiting for an embedding, optionally for one user only
    pub async fn chunks_missing_embeddings(
        &self,
        user_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<PendingChunk>> {
        let chunks = sqlx::query_as::<_, PendingChunk>(
            r"
            SELECT c.id, c.content
            FROM document_chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE c.embedding IS NULL
                AND ($1::uuid IS NULL OR d.user_id = $1)
            ORDER BY c.created_at, c.chunk_index
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(chunks)
    }

    /// Store a computed embedding; the only post-creation write to a chunk
    pub async fn set_chunk_embedding(&self, chunk_id: Uuid, embedding: Vec<f32>) -> Result<()> {
        sqlx::query("UPDATE document_chunks SET embedding = $2 WHERE id = $1")
            .bind(chunk_id)
            .bind(Vector::from(embedding))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn document_stats(&self, user_id: Uuid) -> Result<DocumentStats> {
        let stats = sqlx::query_as::<_, DocumentStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM documents WHERE user_id = $1) AS total_documents,
                (SELECT COUNT(*) FROM document_chunks c
                    JOIN documents d ON d.id = c.document_id
                    WHERE d.user_id = $1) AS total_chunks,
                (SELECT COUNT(*) FROM document_chunks c
                    JOIN documents d ON d.id = c.document_id
                    WHERE d.user_id = $1 AND c.embedding IS NOT NULL) AS embedded_chunks,
                (SELECT COALESCE(SUM(size), 0)::BIGINT FROM documents WHERE user_id = $1) AS total_bytes
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

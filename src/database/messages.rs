use sqlx::types::Json;
use uuid::Uuid;

use super::Database;
use crate::models::Message;
use crate::models::MessageRole;
use crate::models::Source;
use crate::Result;

impl Database {
    /// Append a message to a conversation
    pub async fn insert_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        sources: Option<&[Source]>,
    ) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r"
            INSERT INTO messages (id, conversation_id, role, content, sources)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(sources.map(Json))
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// All messages of a conversation, oldest first
    pub async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at, id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// The last `limit` messages of a conversation, oldest first
    pub async fn recent_messages(&self, conversation_id: Uuid, limit: usize) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r"
            SELECT * FROM (
                SELECT * FROM messages
                WHERE conversation_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            ) recent
            ORDER BY created_at, id
            ",
        )
        .bind(conversation_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}

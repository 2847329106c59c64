use sqlx::types::Json;
use uuid::Uuid;

use super::Database;
use crate::models::Conversation;
use crate::models::ConversationSettings;
use crate::models::ConversationSummary;
use crate::Result;

impl Database {
    pub async fn create_conversation(
        &self,
        user_id: Uuid,
        title: Option<&str>,
        settings: &ConversationSettings,
    ) -> Result<Conversation> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r"
            INSERT INTO conversations (id, user_id, title, settings)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(Json(settings))
        .fetch_one(&self.pool)
        .await?;

        Ok(conversation)
    }

    /// List a user's conversations, most recently active first
    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        let conversations = sqlx::query_as::<_, ConversationSummary>(
            r"
            SELECT
                c.id,
                c.title,
                c.settings,
                (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS message_count,
                c.created_at,
                c.updated_at
            FROM conversations c
            WHERE c.user_id = $1
            ORDER BY c.updated_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    /// Get a conversation owned by the given user
    pub async fn get_conversation(&self, user_id: Uuid, id: Uuid) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    pub async fn update_conversation_settings(
        &self,
        user_id: Uuid,
        id: Uuid,
        settings: &ConversationSettings,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r"
            UPDATE conversations
            SET settings = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(Json(settings))
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    /// Set the title only if the conversation has none yet
    pub async fn set_conversation_title_if_missing(&self, id: Uuid, title: &str) -> Result<()> {
        sqlx::query("UPDATE conversations SET title = $2 WHERE id = $1 AND title IS NULL")
            .bind(id)
            .bind(title)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Bump `updated_at` after new activity
    pub async fn touch_conversation(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a conversation; its messages go with it
    ///
    /// Returns false when nothing owned by the user matched.
    pub async fn delete_conversation(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::RagChatError;

/// Account identity; owns conversations and documents
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Retrieval settings stored per conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSettings {
    #[serde(default = "crate::config::default_top_k")]
    pub top_k: usize,
    #[serde(default = "crate::config::default_threshold")]
    pub threshold: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<Uuid>>,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            top_k: crate::config::default_top_k(),
            threshold: crate::config::default_threshold(),
            document_ids: None,
        }
    }
}

impl ConversationSettings {
    /// Check ranges accepted by the retriever
    pub fn validate(&self) -> crate::Result<()> {
        if self.top_k == 0 || self.top_k > MAX_TOP_K {
            return Err(RagChatError::validation(format!(
                "topK must be between 1 and {MAX_TOP_K}"
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(RagChatError::validation(
                "threshold must be between 0 and 1",
            ));
        }
        Ok(())
    }

    /// Merge a partial update into these settings
    #[must_use]
    pub fn merged(&self, patch: &ConversationSettingsPatch) -> Self {
        Self {
            top_k: patch.top_k.unwrap_or(self.top_k),
            threshold: patch.threshold.unwrap_or(self.threshold),
            document_ids: match &patch.document_ids {
                Some(ids) => ids.clone(),
                None => self.document_ids.clone(),
            },
        }
    }
}

/// Upper bound on chunks retrieved per question
pub const MAX_TOP_K: usize = 50;

/// Partial settings update; `documentIds: null` clears the document filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSettingsPatch {
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub document_ids: Option<Option<Vec<Uuid>>>,
}

/// Distinguishes an absent field from an explicit `null`
fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub settings: Json<ConversationSettings>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conversation list entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub settings: Json<ConversationSettings>,
    pub message_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = RagChatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(RagChatError::validation(format!(
                "unknown message role: {other}"
            ))),
        }
    }
}

/// Citation attached to an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub document_title: String,
    pub content: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: MessageRole,
    pub content: String,
    pub sources: Option<Json<Vec<Source>>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size: i64,
    #[serde(skip_serializing)]
    pub content: String,
    pub chunk_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    pub token_count: i32,
    #[serde(skip)]
    pub embedding: Option<pgvector::Vector>,
    pub metadata: Json<ChunkMetadata>,
    pub created_at: DateTime<Utc>,
}

/// Chunk text ready to be inserted alongside its document
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub chunk_index: usize,
    pub content: String,
    pub token_count: usize,
    pub metadata: ChunkMetadata,
    pub embedding: Option<Vec<f32>>,
}

/// Document to be inserted
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size: i64,
    pub content: String,
}

/// Chunk matched by a similarity search
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ChunkMatch {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub document_title: String,
    pub content: String,
    pub similarity: f64,
}

impl From<&ChunkMatch> for Source {
    fn from(m: &ChunkMatch) -> Self {
        Self {
            chunk_id: m.chunk_id,
            document_id: m.document_id,
            document_title: m.document_title.clone(),
            content: m.content.clone(),
            similarity: m.similarity as f32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_documents: i64,
    pub total_chunks: i64,
    pub embedded_chunks: i64,
    pub total_bytes: i64,
}

/// Chunk whose embedding has not been computed yet
#[derive(Debug, Clone, FromRow)]
pub struct PendingChunk {
    pub id: Uuid,
    pub content: String,
}

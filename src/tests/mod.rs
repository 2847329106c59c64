
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::ChunkMetadata;
use crate::models::NewChunk;
use crate::models::User;
use crate::Result;

/// Test helper to create a test database connection with the schema in place
pub async fn create_test_database() -> Result<Database> {
    let config = AppConfig::load()?;
    let database = Database::from_config(&config).await?;
    database.init_schema().await?;
    Ok(database)
}

/// Create a throwaway user; remove it with [`cleanup_test_user`]
pub async fn create_test_user(database: &Database) -> Result<(User, String)> {
    database
        .create_user(&format!("test-{}", Uuid::new_v4().simple()))
        .await
}

/// Deleting the user cascades to its documents and conversations
pub async fn cleanup_test_user(database: &Database, user_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(database.pool())
        .await?;
    Ok(())
}

/// Unit vector along one axis, so cosine similarity between axes is 0 or 1
pub fn axis_embedding(dimension: usize, axis: usize) -> Vec<f32> {
    let mut embedding = vec![0.0; dimension];
    embedding[axis % dimension] = 1.0;
    embedding
}

pub fn test_chunk(index: usize, content: &str, embedding: Option<Vec<f32>>) -> NewChunk {
    NewChunk {
        chunk_index: index,
        content: content.to_string(),
        token_count: content.chars().count().div_ceil(4),
        metadata: ChunkMetadata {
            index,
            start_offset: None,
        },
        embedding,
    }
}

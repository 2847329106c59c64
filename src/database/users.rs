use sha2::Digest;
use sha2::Sha256;
use uuid::Uuid;

use super::Database;
use crate::models::User;
use crate::Result;

/// Hash an API token for storage and lookup
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_token() -> String {
    format!("rc_{}", Uuid::new_v4().simple())
}

impl Database {
    /// Create a user and return it with its plaintext API token
    ///
    /// Only the token hash is stored; the plaintext is shown once.
    pub async fn create_user(&self, name: &str) -> Result<(User, String)> {
        let token = generate_token();

        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (id, name, api_token_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(hash_token(&token))
        .fetch_one(&self.pool)
        .await?;

        Ok((user, token))
    }

    /// Resolve a bearer token to its user
    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at FROM users WHERE api_token_hash = $1",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users =
            sqlx::query_as::<_, User>("SELECT id, name, created_at FROM users ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        Ok(users)
    }
}

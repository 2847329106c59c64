use super::Database;
use crate::RagChatError;
use crate::Result;

/// Tables the service cannot run without
const REQUIRED_TABLES: [&str; 5] = [
    "users",
    "conversations",
    "messages",
    "documents",
    "document_chunks",
];

impl Database {
    /// Check if database schema is initialized
    /// Returns true if all required tables exist
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        for table_name in REQUIRED_TABLES {
            let exists = sqlx::query_scalar::<_, bool>(
                r"
                SELECT EXISTS (
                    SELECT FROM information_schema.tables
                    WHERE table_schema = 'public'
                    AND table_name = $1
                )
                ",
            )
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

            if !exists {
                tracing::debug!("Missing required table: {}", table_name);
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Verify database schema or return helpful error
    pub async fn verify_schema_or_error(&self) -> Result<()> {
        if !self.is_schema_initialized().await? {
            return Err(RagChatError::Custom(
                "Database schema not initialized. Run `ragchat init` first.".to_string(),
            ));
        }
        Ok(())
    }

    /// Initialize database schema
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                api_token_hash TEXT UNIQUE NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT,
                settings JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id UUID PRIMARY KEY,
                conversation_id UUID NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
                content TEXT NOT NULL,
                sources JSONB,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                filename TEXT,
                mime_type TEXT,
                size BIGINT NOT NULL DEFAULT 0,
                content TEXT NOT NULL,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // The vector width is fixed at creation time by the configured model
        let chunks_ddl = format!(
            r"
            CREATE TABLE IF NOT EXISTS document_chunks (
                id UUID PRIMARY KEY,
                document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                token_count INTEGER NOT NULL DEFAULT 0,
                embedding VECTOR({}),
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE(document_id, chunk_index)
            )
            ",
            self.embedding_dimension
        );
        sqlx::query(&chunks_ddl).execute(&self.pool).await?;

        self.create_indexes().await?;

        tracing::info!(
            "Database schema initialized (embedding dimension {})",
            self.embedding_dimension
        );
        Ok(())
    }

    async fn create_indexes(&self) -> Result<()> {
        let statements = [
            "CREATE INDEX IF NOT EXISTS idx_conversations_user_updated ON conversations(user_id, updated_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation_created ON messages(conversation_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_documents_user_created ON documents(user_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_document_chunks_document ON document_chunks(document_id, chunk_index)",
        ];
        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::debug!("Essential indexes ensured");
        Ok(())
    }

    /// Create the approximate-nearest-neighbour index on chunk embeddings
    ///
    /// IVFFlat needs rows to build good lists, so this is run separately once
    /// documents have been ingested.
    pub async fn create_vector_index(&self, lists: usize) -> Result<()> {
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS idx_document_chunks_embedding ON document_chunks \
             USING ivfflat (embedding vector_cosine_ops) WITH (lists = {})",
            lists.max(1)
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

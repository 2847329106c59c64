//! Document ingestion and management handlers

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::cli::output::print_document_list;
use crate::cli::output::print_document_stats;
use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::database::Database;
use crate::documents::DocumentService;
use crate::embeddings::EmbeddingService;
use crate::errors::RagChatError;
use crate::AppConfig;
use crate::Result;

async fn document_service(config: &AppConfig) -> Result<DocumentService> {
    let database = Arc::new(Database::from_config(config).await?);
    database.verify_schema_or_error().await?;
    let embedding_service = Arc::new(EmbeddingService::new(config)?);
    Ok(DocumentService::new(config, database, embedding_service))
}

/// Ingest a local text file
pub async fn handle_ingest(
    config: &AppConfig,
    path: &Path,
    user_id: Uuid,
    title: Option<String>,
    skip_embeddings: bool,
) -> Result<()> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RagChatError::validation(format!("Invalid path: {}", path.display())))?
        .to_string();

    let bytes = tokio::fs::read(path).await?;
    let service = document_service(config).await?;

    print_info(&format!("📄 Ingesting {} ({} bytes)...", filename, bytes.len()));

    let document = if skip_embeddings {
        service
            .upload_deferred(user_id, &filename, None, &bytes, title)
            .await?
    } else {
        service
            .upload(user_id, &filename, None, &bytes, title)
            .await?
    };

    print_success(&format!(
        "Document {} \"{}\" stored with {} chunks",
        document.id, document.title, document.chunk_count
    ));
    if skip_embeddings {
        print_info("Chunks have no embeddings yet; run `ragchat embed` to compute them");
    }
    Ok(())
}

pub async fn handle_docs_list(config: &AppConfig, user_id: Uuid) -> Result<()> {
    let service = document_service(config).await?;
    let documents = service.list(user_id).await?;
    print_document_list(&documents);
    Ok(())
}

pub async fn handle_docs_delete(config: &AppConfig, user_id: Uuid, id: Uuid) -> Result<()> {
    let service = document_service(config).await?;
    service.delete(user_id, id).await?;
    print_success(&format!("Deleted document {id}"));
    Ok(())
}

pub async fn handle_docs_stats(config: &AppConfig, user_id: Uuid) -> Result<()> {
    let service = document_service(config).await?;
    let stats = service.stats(user_id).await?;
    print_document_stats(&stats);
    Ok(())
}

/// Backfill embeddings for chunks stored without one
pub async fn handle_embed(config: &AppConfig, user_id: Option<Uuid>) -> Result<()> {
    print_info("🚀 Starting embeddings backfill...");

    let service = document_service(config).await?;
    let embedded = service.embed_pending(user_id).await?;

    if embedded == 0 {
        print_info("All chunks already have embeddings");
    } else {
        print_success(&format!("Embedded {embedded} chunks"));
    }
    Ok(())
}

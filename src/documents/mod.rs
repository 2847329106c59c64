//! Document ingestion: chunking, embedding and storage
//!
//! Documents are plain UTF-8 text. Every document is split with
//! [`chunk_text`], each chunk is embedded, and the document plus its chunks
//! are written in one transaction.

pub mod chunker;

use std::path::Path;
use std::sync::Arc;

pub use chunker::chunk_text;
pub use chunker::estimate_tokens;
use serde::Deserialize;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::Database;
use crate::embeddings::EmbeddingService;
use crate::errors::RagChatError;
use crate::errors::Result;
use crate::models::Document;
use crate::models::DocumentStats;
use crate::models::NewChunk;
use crate::models::NewDocument;

/// Extensions accepted for upload regardless of the declared MIME type
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "json"];

/// Batch size used when backfilling missing embeddings
const EMBED_BATCH_SIZE: usize = 64;

/// Document created from JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Whether an uploaded file is treated as UTF-8 text
///
/// Accepts `text/*` and `application/json` MIME types, or a known text
/// extension when the client sends a generic type such as
/// `application/octet-stream`.
#[must_use]
pub fn is_supported_upload(filename: &str, mime_type: Option<&str>) -> bool {
    let mime_ok = mime_type.is_some_and(|mime| {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence.starts_with("text/") || essence == "application/json"
    });

    let extension_ok = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

    mime_ok || extension_ok
}

/// Title derived from a filename: the stem, or the name itself
fn title_from_filename(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or(filename)
        .to_string()
}

/// Service for creating, listing and deleting documents
pub struct DocumentService {
    database: Arc<Database>,
    embedding_service: Arc<EmbeddingService>,
    max_chunk_tokens: usize,
    max_upload_bytes: usize,
}

impl DocumentService {
    pub fn new(
        config: &AppConfig,
        database: Arc<Database>,
        embedding_service: Arc<EmbeddingService>,
    ) -> Self {
        Self {
            database,
            embedding_service,
            max_chunk_tokens: config.documents.max_chunk_tokens,
            max_upload_bytes: config.documents.max_upload_bytes,
        }
    }

    pub const fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Create a document from text, embedding every chunk
    ///
    /// If embedding fails nothing is stored.
    pub async fn create(&self, user_id: Uuid, request: CreateDocumentRequest) -> Result<Document> {
        let document = Self::validate_request(request)?;
        self.ingest(user_id, document, true).await
    }

    /// Create a document whose chunks are embedded later by [`Self::embed_pending`]
    pub async fn create_deferred(
        &self,
        user_id: Uuid,
        request: CreateDocumentRequest,
    ) -> Result<Document> {
        let document = Self::validate_request(request)?;
        self.ingest(user_id, document, false).await
    }

    /// Create a document from an uploaded file
    ///
    /// Only UTF-8 text types are accepted; the title defaults to the
    /// filename without its extension.
    pub async fn upload(
        &self,
        user_id: Uuid,
        filename: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
        title: Option<String>,
    ) -> Result<Document> {
        let request = self.upload_request(filename, mime_type, bytes, title)?;
        self.create(user_id, request).await
    }

    /// Like [`Self::upload`], leaving the chunks without embeddings
    pub async fn upload_deferred(
        &self,
        user_id: Uuid,
        filename: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
        title: Option<String>,
    ) -> Result<Document> {
        let request = self.upload_request(filename, mime_type, bytes, title)?;
        self.create_deferred(user_id, request).await
    }

    fn upload_request(
        &self,
        filename: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
        title: Option<String>,
    ) -> Result<CreateDocumentRequest> {
        if bytes.len() > self.max_upload_bytes {
            return Err(RagChatError::PayloadTooLarge(format!(
                "File too large: {} bytes (limit {})",
                bytes.len(),
                self.max_upload_bytes
            )));
        }

        if !is_supported_upload(filename, mime_type) {
            return Err(RagChatError::validation(format!(
                "Unsupported file type: {}",
                mime_type.unwrap_or(filename)
            )));
        }

        let content = std::str::from_utf8(bytes)
            .map_err(|_| RagChatError::validation("File is not valid UTF-8 text"))?
            .to_string();

        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| title_from_filename(filename));

        Ok(CreateDocumentRequest {
            title,
            content,
            filename: Some(filename.to_string()),
            mime_type: mime_type.map(str::to_string),
        })
    }

    fn validate_request(request: CreateDocumentRequest) -> Result<NewDocument> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(RagChatError::validation("title is required"));
        }
        if request.content.trim().is_empty() {
            return Err(RagChatError::validation("content is required"));
        }

        Ok(NewDocument {
            title,
            filename: request.filename,
            mime_type: request.mime_type,
            size: request.content.len() as i64,
            content: request.content,
        })
    }

    async fn ingest(&self, user_id: Uuid, document: NewDocument, embed: bool) -> Result<Document> {
        let mut chunks = chunk_text(&document.content, self.max_chunk_tokens);

        if embed {
            self.embed_chunks(&mut chunks).await?;
        }

        let created = self
            .database
            .create_document_with_chunks(user_id, document, chunks)
            .await?;

        info!(
            "Created document {} ({} bytes, {} chunks, embedded={})",
            created.id, created.size, created.chunk_count, embed
        );
        Ok(created)
    }

    async fn embed_chunks(&self, chunks: &mut [NewChunk]) -> Result<()> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding_service.generate_batch(&texts).await?;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(embedding);
        }
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Document>> {
        self.database.list_documents(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Document> {
        self.database
            .get_document(user_id, id)
            .await?
            .ok_or_else(|| RagChatError::not_found(format!("Document {id}")))
    }

    /// Delete a document and, by cascade, its chunks
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        if self.database.delete_document(user_id, id).await? {
            info!("Deleted document {}", id);
            Ok(())
        } else {
            Err(RagChatError::not_found(format!("Document {id}")))
        }
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<DocumentStats> {
        self.database.document_stats(user_id).await
    }

    /// Compute embeddings for chunks stored without one
    ///
    /// Processes every pending chunk (optionally for one user) and returns how
    /// many were embedded. A failing batch aborts the backfill; chunks already
    /// written keep their embeddings.
    pub async fn embed_pending(&self, user_id: Option<Uuid>) -> Result<usize> {
        let mut embedded = 0;

        loop {
            let pending = self
                .database
                .chunks_missing_embeddings(user_id, EMBED_BATCH_SIZE)
                .await?;
            if pending.is_empty() {
                break;
            }

            let texts: Vec<&str> = pending.iter().map(|c| c.content.as_str()).collect();
            let embeddings = match self.embedding_service.generate_batch(&texts).await {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    warn!("Embedding backfill stopped after {} chunks: {}", embedded, e);
                    return Err(e);
                }
            };

            for (chunk, embedding) in pending.iter().zip(embeddings) {
                self.database.set_chunk_embedding(chunk.id, embedding).await?;
                embedded += 1;
            }

            info!("Embedded {} chunks so far", embedded);
        }

        Ok(embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_upload_by_mime() {
        assert!(is_supported_upload("notes", Some("text/plain")));
        assert!(is_supported_upload("notes", Some("text/markdown; charset=utf-8")));
        assert!(is_supported_upload("data", Some("application/json")));
        assert!(!is_supported_upload("report.pdf", Some("application/pdf")));
        assert!(!is_supported_upload("image", Some("image/png")));
    }

    #[test]
    fn test_supported_upload_by_extension() {
        assert!(is_supported_upload("README.md", Some("application/octet-stream")));
        assert!(is_supported_upload("table.CSV", None));
        assert!(is_supported_upload("notes.txt", None));
        assert!(!is_supported_upload("archive.zip", None));
        assert!(!is_supported_upload("noext", None));
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("handbook.md"), "handbook");
        assert_eq!(title_from_filename("archive.tar.gz"), "archive.tar");
        assert_eq!(title_from_filename("plain"), "plain");
    }

    #[test]
    fn test_validate_request() {
        let document = DocumentService::validate_request(CreateDocumentRequest {
            title: "  Handbook ".to_string(),
            content: "Vacation is 25 days.".to_string(),
            filename: None,
            mime_type: None,
        })
        .unwrap();
        assert_eq!(document.title, "Handbook");
        assert_eq!(document.size, 20);

        let err = DocumentService::validate_request(CreateDocumentRequest {
            title: " ".to_string(),
            content: "text".to_string(),
            filename: None,
            mime_type: None,
        })
        .unwrap_err();
        assert!(matches!(err, RagChatError::Validation(_)));

        let err = DocumentService::validate_request(CreateDocumentRequest {
            title: "T".to_string(),
            content: "\n\n".to_string(),
            filename: None,
            mime_type: None,
        })
        .unwrap_err();
        assert!(matches!(err, RagChatError::Validation(_)));
    }

    fn service(max_upload_bytes: usize) -> DocumentService {
        let mut config = AppConfig::default();
        config.documents.max_upload_bytes = max_upload_bytes;
        let database = Arc::new(Database::connect_lazy(&config).unwrap());
        let embedding_service = Arc::new(EmbeddingService::new(&config).unwrap());
        DocumentService::new(&config, database, embedding_service)
    }

    #[tokio::test]
    async fn test_upload_request_checks() {
        let service = service(16);

        let request = service
            .upload_request("handbook.md", Some("text/markdown"), b"Vacation: 25", None)
            .unwrap();
        assert_eq!(request.title, "handbook");
        assert_eq!(request.filename.as_deref(), Some("handbook.md"));
        assert_eq!(request.mime_type.as_deref(), Some("text/markdown"));

        let request = service
            .upload_request("a.txt", None, b"text", Some("Custom".to_string()))
            .unwrap();
        assert_eq!(request.title, "Custom");

        let too_large = service.upload_request("a.txt", None, &[b'x'; 17], None);
        assert!(matches!(too_large, Err(RagChatError::PayloadTooLarge(msg)) if msg.contains("too large")));

        let unsupported = service.upload_request("a.pdf", Some("application/pdf"), b"%PDF", None);
        assert!(matches!(unsupported, Err(RagChatError::Validation(msg)) if msg.contains("Unsupported")));

        let binary = service.upload_request("a.txt", None, &[0xff, 0xfe, 0x00], None);
        assert!(matches!(binary, Err(RagChatError::Validation(msg)) if msg.contains("UTF-8")));
    }
}

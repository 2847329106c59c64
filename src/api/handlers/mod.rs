/// API request handlers
use std::sync::Arc;

use axum::Json;

use crate::api::types::ApiResponse;
use crate::api::types::HealthResponse;
use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::database::Database;
use crate::documents::DocumentService;
use crate::embeddings::EmbeddingService;
use crate::llm::LlmService;
use crate::rag::RagService;
use crate::Result;

pub mod conversations;
pub mod documents;
pub mod messages;

pub use conversations::*;
pub use documents::*;
pub use messages::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub chat: Arc<ChatService>,
    pub documents: Arc<DocumentService>,
    /// Hide internal error messages from callers
    pub production: bool,
}

impl AppState {
    /// Wire all services on top of a database handle
    pub fn new(config: &AppConfig, database: Arc<Database>) -> Result<Self> {
        let embedding_service = Arc::new(EmbeddingService::new(config)?);
        let llm_service = LlmService::new(config)?;

        let rag = Arc::new(RagService::from_services(
            Arc::clone(&database),
            Arc::clone(&embedding_service),
            llm_service,
            config,
        ));

        Ok(Self {
            chat: Arc::new(ChatService::new(config, Arc::clone(&database), rag)),
            documents: Arc::new(DocumentService::new(
                config,
                Arc::clone(&database),
                embedding_service,
            )),
            database,
            production: config.server.is_production(),
        })
    }
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

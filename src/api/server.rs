//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::database::Database;
use crate::Result;

/// Build the application router with its middleware layers
pub fn build_app(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(TraceLayer::new_for_http())
        // text/event-stream responses are never compressed
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("🚀 Starting ragchat API server...");

    let database = Arc::new(Database::from_config(config).await?);
    database.verify_schema_or_error().await?;

    info!("Environment: {}", config.server.environment);

    let state = AppState::new(config, database)?;
    let app = build_app(state, enable_cors);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET    /api/health                                - Health check");
    info!("  GET    /api/chat/conversations                    - List conversations");
    info!("  POST   /api/chat/conversations                    - Create conversation");
    info!("  GET    /api/chat/conversations/:id                - Conversation with messages");
    info!("  DELETE /api/chat/conversations/:id                - Delete conversation");
    info!("  PATCH  /api/chat/conversations/:id/settings       - Update retrieval settings");
    info!("  POST   /api/chat/conversations/:id/messages       - Send message");
    info!("  POST   /api/chat/conversations/:id/messages/stream - Send message (SSE)");
    info!("  POST   /api/chat/quick                            - One-off question");
    info!("  GET    /api/documents                             - List documents");
    info!("  POST   /api/documents                             - Create document");
    info!("  POST   /api/documents/upload                      - Upload document");
    info!("  GET    /api/documents/stats                       - Document statistics");
    info!("  GET    /api/documents/:id                         - Get document");
    info!("  DELETE /api/documents/:id                         - Delete document");

    axum::serve(listener, app).await?;

    Ok(())
}

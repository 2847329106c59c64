//! API route definitions

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::Router;

use super::auth::auth_middleware;
use super::error::mask_server_errors;
use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create RESTful API router
///
/// Everything except `/health` requires a bearer token. Internal errors are
/// masked in production, including those raised by the auth layer.
pub fn api_routes(state: AppState) -> Router {
    let upload_limit = state.documents.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    let protected = Router::new()
        // Conversations
        .route(
            "/chat/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/chat/conversations/:id",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .route(
            "/chat/conversations/:id/settings",
            patch(handlers::update_conversation_settings),
        )
        // Messages
        .route(
            "/chat/conversations/:id/messages",
            post(handlers::send_message),
        )
        .route(
            "/chat/conversations/:id/messages/stream",
            post(handlers::stream_message),
        )
        .route("/chat/quick", post(handlers::quick_chat))
        // Documents
        .route(
            "/documents",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route(
            "/documents/upload",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/stats", get(handlers::document_stats))
        .route(
            "/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mask_server_errors,
        ))
        .with_state(state)
}

/// Conversation API handlers
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::api::auth::CurrentUser;
use crate::api::error::ApiError;
use crate::api::types::ApiJson;
use crate::api::types::ApiPath;
use crate::api::types::ApiResponse;
use crate::api::types::CreateConversationRequest;
use crate::api::types::DeleteResponse;
use crate::models::Conversation;
use crate::models::ConversationSettingsPatch;
use crate::models::ConversationSummary;
use crate::models::ConversationWithMessages;

/// List conversations (GET /api/chat/conversations)
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<ConversationSummary>>>, ApiError> {
    let conversations = state.chat.list_conversations(user.id).await?;
    Ok(Json(ApiResponse::success(conversations)))
}

/// Create a conversation (POST /api/chat/conversations)
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Conversation>>), ApiError> {
    info!("POST /api/chat/conversations");

    let conversation = state
        .chat
        .create_conversation(user.id, req.title, req.settings)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(conversation))))
}

/// Conversation with its messages (GET /api/chat/conversations/:id)
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ConversationWithMessages>>, ApiError> {
    let conversation = state
        .chat
        .get_conversation_with_messages(user.id, id)
        .await?;
    Ok(Json(ApiResponse::success(conversation)))
}

/// Delete a conversation (DELETE /api/chat/conversations/:id)
pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    info!("DELETE /api/chat/conversations/{}", id);

    state.chat.delete_conversation(user.id, id).await?;
    Ok(Json(ApiResponse::success(DeleteResponse { id, deleted: true })))
}

/// Partially update settings (PATCH /api/chat/conversations/:id/settings)
pub async fn update_conversation_settings(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ConversationSettingsPatch>,
) -> Result<Json<ApiResponse<Conversation>>, ApiError> {
    let conversation = state.chat.update_settings(user.id, id, &patch).await?;
    Ok(Json(ApiResponse::success(conversation)))
}

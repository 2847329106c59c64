/// Message and question API handlers
use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use axum::Extension;
use axum::Json;
use futures::Stream;
use futures::StreamExt;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::AppState;
use crate::api::auth::CurrentUser;
use crate::api::error::ApiError;
use crate::api::types::ApiJson;
use crate::api::types::ApiPath;
use crate::api::types::ApiResponse;
use crate::api::types::QuickChatRequest;
use crate::api::types::QuickChatResponse;
use crate::api::types::SendMessageRequest;
use crate::chat::SendMessageResponse;
use crate::sse::ChatEvent;

/// Send a message and wait for the answer (POST /api/chat/conversations/:id/messages)
pub async fn send_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<Json<ApiResponse<SendMessageResponse>>, ApiError> {
    info!("POST /api/chat/conversations/{}/messages", id);

    let response = state.chat.send_message(user.id, id, &req.content).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Send a message and stream the answer as SSE
/// (POST /api/chat/conversations/:id/messages/stream)
pub async fn stream_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    info!("POST /api/chat/conversations/{}/messages/stream", id);

    let events = state.chat.stream_message(user.id, id, &req.content).await?;
    let stream = events.map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Frame a chat event as `data: <json>`
fn to_sse_event(event: &ChatEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        warn!("Failed to serialize chat event: {}", e);
        Event::default().data(r#"{"type":"error","error":"Failed to serialize event"}"#)
    })
}

/// One-off question without a conversation (POST /api/chat/quick)
pub async fn quick_chat(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<QuickChatRequest>,
) -> Result<Json<ApiResponse<QuickChatResponse>>, ApiError> {
    info!("POST /api/chat/quick");

    let response = state
        .chat
        .quick_chat(user.id, &req.question, req.settings)
        .await?;

    Ok(Json(ApiResponse::success(QuickChatResponse {
        answer: response.answer,
        sources: response.sources,
    })))
}

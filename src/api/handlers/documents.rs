/// Document API handlers
use axum::extract::Multipart;
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
use crate::api::types::DeleteResponse;
use crate::documents::CreateDocumentRequest;
use crate::errors::RagChatError;
use crate::models::Document;
use crate::models::DocumentStats;

/// List documents (GET /api/documents)
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<Document>>>, ApiError> {
    let documents = state.documents.list(user.id).await?;
    Ok(Json(ApiResponse::success(documents)))
}

/// Create a document from JSON text (POST /api/documents)
pub async fn create_document(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Document>>), ApiError> {
    info!("POST /api/documents: {}", req.title);

    let document = state.documents.create(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(document))))
}

/// Upload a text file (POST /api/documents/upload)
///
/// Multipart fields: `file` (required) and `title` (optional).
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Document>>), ApiError> {
    let mut file = None;
    let mut title = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some((filename, mime_type, bytes));
            }
            Some("title") => title = Some(field.text().await?),
            _ => {}
        }
    }

    let (filename, mime_type, bytes) =
        file.ok_or_else(|| RagChatError::validation("multipart field `file` is required"))?;

    info!("POST /api/documents/upload: {} ({} bytes)", filename, bytes.len());

    let document = state
        .documents
        .upload(user.id, &filename, mime_type.as_deref(), &bytes, title)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(document))))
}

/// Get one document (GET /api/documents/:id)
pub async fn get_document(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Document>>, ApiError> {
    let document = state.documents.get(user.id, id).await?;
    Ok(Json(ApiResponse::success(document)))
}

/// Delete a document and its chunks (DELETE /api/documents/:id)
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    info!("DELETE /api/documents/{}", id);

    state.documents.delete(user.id, id).await?;
    Ok(Json(ApiResponse::success(DeleteResponse { id, deleted: true })))
}

/// Document statistics (GET /api/documents/stats)
pub async fn document_stats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<DocumentStats>>, ApiError> {
    let stats = state.documents.stats(user.id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

//! Error responses for the HTTP API
//!
//! Every handler error is rendered as an [`ApiResponse`] with the status
//! from [`RagChatError::status_code`]. When the app runs in production,
//! [`mask_server_errors`] swaps the message of 500 responses for a generic
//! one; the real message only goes to the log.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use tracing::debug;
use tracing::error;

use crate::api::handlers::AppState;
use crate::api::types::ApiResponse;
use crate::errors::RagChatError;

const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

/// Machine code of a rendered error, kept in the response extensions
#[derive(Debug, Clone, Copy)]
struct ErrorCode(&'static str);

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError(pub RagChatError);

impl From<RagChatError> for ApiError {
    fn from(e: RagChatError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RagChatError::validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(RagChatError::validation(rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        let message = format!("Invalid upload: {}", e.body_text());
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self(RagChatError::PayloadTooLarge(message))
        } else {
            Self(RagChatError::validation(message))
        }
    }
}

/// Status and body for an error
pub fn error_response_parts(
    error: &RagChatError,
    production: bool,
) -> (StatusCode, ApiResponse<()>) {
    let status = error.status_code();
    let message = if production && status == StatusCode::INTERNAL_SERVER_ERROR {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        error.to_string()
    };

    (status, ApiResponse::error_with_code(message, error.code()))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = error_response_parts(&self.0, false);

        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self.0);
        } else {
            debug!("Request rejected ({}): {}", status, self.0);
        }

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorCode(self.0.code()));
        response
    }
}

/// Replace the message of internal errors when running in production
pub async fn mask_server_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.production || response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    match response.extensions().get::<ErrorCode>().copied() {
        Some(ErrorCode(code)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error_with_code(GENERIC_ERROR_MESSAGE, code)),
        )
            .into_response(),
        None => response,
    }
}

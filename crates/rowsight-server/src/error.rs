//! HTTP-facing error type for the extraction routes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors a route handler can surface to the client.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself was unusable (no files, empty filename, bad
    /// multipart framing).
    BadRequest(String),
    /// Something on our side broke while handling a well-formed request.
    Internal(anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::BadRequest(message) => message.clone(),
            Self::Internal(err) => {
                tracing::error!(error = %err, "request handling failed");
                "internal server error".to_string()
            }
        };
        (self.status_code(), Json(json!({ "error": message }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

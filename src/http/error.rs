//! Error type mapping domain failures to HTTP status codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::db::StoreError;
use crate::provider::ProviderError;

#[derive(Debug)]
pub enum AppError {
    Store(StoreError),
    Provider(ProviderError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        AppError::Provider(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, "User not found".to_string())
            }
            // Duplicate registration surfaces as 400, matching the
            // contract the frontend was built against
            AppError::Store(StoreError::Conflict) => {
                (StatusCode::BAD_REQUEST, "User already exists".to_string())
            }
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Provider(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {message}");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

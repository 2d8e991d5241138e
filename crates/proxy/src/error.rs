use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use flexdata_storage::StorageError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid project id: {0}")]
    InvalidProject(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidProject(id) => {
                (StatusCode::BAD_REQUEST, format!("Invalid project id: {id}"))
            }
            Self::CollectionNotFound(name) => {
                (StatusCode::NOT_FOUND, format!("Collection not found: {name}"))
            }
            Self::Storage(err) => {
                warn!(code = err.code(), error = %err, "proxy read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch data".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

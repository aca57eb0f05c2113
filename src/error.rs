use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Logical failures of the store operations. These travel in the `err` arm
/// of a contract response; they never become HTTP error statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("file {0} not found")]
    NotFound(u64),

    #[error("payload of {size} bytes exceeds the upload limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("invalid upload: {0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Transport-level failures, rendered with the JSON error envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        tracing::error!(status = %status, error = %message);

        let body = json!({
            "data": null,
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error taxonomy for the booking engine.
///
/// `SlotUnavailable` deliberately carries no detail: a lost race and a
/// never-valid instant must be indistinguishable to the caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("requested time slot is not available")]
    SlotUnavailable,

    #[error("storage error: {0}")]
    Storage(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::SlotUnavailable => StatusCode::CONFLICT,
            ServiceError::Storage(msg) => {
                error!("Storage failure: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

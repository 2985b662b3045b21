use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use awbtrack::{ControlError, EngineError, ExportError, StoreError};

/// Application-level error type for HTTP handlers.
///
/// Renders as `{ "error": message, "code": CODE }` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

fn internal(err: &dyn std::error::Error) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Store(StoreError::NotFound(_))
            | AppError::Control(ControlError::JobNotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            AppError::Control(ControlError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "CONFLICT", self.to_string())
            }
            AppError::Engine(EngineError::ShuttingDown) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SHUTTING_DOWN",
                self.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Store(err) => internal(err),
            AppError::Control(err) => internal(err),
            AppError::Engine(err) => internal(err),
            AppError::Export(err) => internal(err),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

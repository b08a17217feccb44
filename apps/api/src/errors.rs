use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Pipeline-shaped failures (`MissingInput`, `StageFailed`) render as a flat
/// `{"error": "..."}` sentinel, matching what a failed stage stores in state.
/// Everything else uses the `{"error": {"code", "message"}}` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Stage failed: {0}")]
    StageFailed(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::MissingResumeText | PipelineError::InvalidResumePoint(_) => {
                AppError::Validation(err.to_string())
            }
            PipelineError::MissingInput { .. } => AppError::MissingInput(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::MissingInput(msg) => {
                return sentinel(StatusCode::UNPROCESSABLE_ENTITY, msg);
            }
            AppError::StageFailed(msg) => {
                tracing::error!("Stage error: {msg}");
                return sentinel(StatusCode::BAD_GATEWAY, msg);
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn sentinel(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

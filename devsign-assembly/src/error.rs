//! Error types for devsign-assembly
//!
//! Every handler error renders as `{"error": {"code", "message"}}`. Domain
//! rejections carry extra fields (`state`, `missing`) so clients can react
//! without parsing the message.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use devsign_common::Error as CommonError;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload over the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// devsign-common error
    #[error("{0}")]
    Common(#[from] CommonError),
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut extra = Map::new();
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(err) => {
                let message = err.to_string();
                match err {
                    CommonError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
                    CommonError::Validation(_) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
                    }
                    CommonError::NotSubmittable { state, .. } => {
                        extra.insert("state".into(), json!(state));
                        (StatusCode::CONFLICT, "NOT_SUBMITTABLE", message)
                    }
                    CommonError::IncompleteSubmission { missing } => {
                        extra.insert("missing".into(), json!(missing));
                        (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            "INCOMPLETE_SUBMISSION",
                            message,
                        )
                    }
                    CommonError::EmptyExport { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_EXPORT", message)
                    }
                    CommonError::Database(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", message)
                    }
                    CommonError::Io(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", message)
                    }
                    CommonError::Config(_)
                    | CommonError::Archive(_)
                    | CommonError::Internal(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
                    }
                }
            }
        };

        if status.is_server_error() {
            error!("{} {}: {}", status.as_u16(), error_code, message);
        }

        let mut body = Map::new();
        body.insert("code".into(), Value::from(error_code));
        body.insert("message".into(), Value::from(message));
        body.extend(extra);

        (status, Json(json!({ "error": body }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use devsign_common::{ArtifactSlot, PeriodState};

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_not_submittable_is_conflict_with_state() {
        let (status, body) = render(ApiError::from(CommonError::NotSubmittable {
            window: "2026-S1-03".into(),
            state: PeriodState::SubmittedLocked,
        }))
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "NOT_SUBMITTABLE");
        assert_eq!(body["error"]["state"], "SUBMITTED_LOCKED");
    }

    #[tokio::test]
    async fn test_incomplete_submission_lists_missing_slots() {
        let (status, body) = render(ApiError::from(CommonError::IncompleteSubmission {
            missing: vec![ArtifactSlot::Document],
        }))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["missing"], json!(["document"]));
    }

    #[tokio::test]
    async fn test_validation_and_not_found_statuses() {
        let (status, body) =
            render(ApiError::from(CommonError::Validation("bad".into()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = render(ApiError::from(CommonError::NotFound("x".into()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = render(ApiError::from(CommonError::EmptyExport {
            window: "2026-S1-03".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "EMPTY_EXPORT");
    }
}

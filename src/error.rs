use crate::domain::BackupError;
use crate::engine::LifecycleError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::IndexOutOfRange { .. } => AppError::NotFound(err.to_string()),
            LifecycleError::ReadOnly(_) | LifecycleError::DuplicateKey(_) => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<BackupError> for AppError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::InvalidFile(_) => AppError::BadRequest(err.to_string()),
            BackupError::Serialize(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreatedKey, Scope};

    #[test]
    fn test_lifecycle_error_status() {
        let not_found: AppError = LifecycleError::IndexOutOfRange {
            scope: Scope::Open,
            index: 4,
            len: 2,
        }
        .into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let read_only: AppError = LifecycleError::ReadOnly(CreatedKey::new("2025-01-01")).into();
        assert_eq!(read_only.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_backup_error_status() {
        let err: AppError = BackupError::InvalidFile("missing closedPositions".to_string()).into();
        assert!(err.to_string().contains("Invalid or corrupted file"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

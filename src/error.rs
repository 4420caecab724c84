//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::classifier::ClassifierError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Resource errors
    NotFound(String),

    // Validation errors
    ValidationError(String),
    PayloadTooLarge(String),

    // Database errors
    DatabaseError(String),

    // Identification errors (message is returned to the caller)
    ClassificationFailed(String),

    // Generic errors
    InternalError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::DatabaseError(_)
            | AppError::ClassificationFailed(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::NotFound(msg) => msg.as_str(),
            AppError::ValidationError(msg) => msg.as_str(),
            AppError::PayloadTooLarge(msg) => msg.as_str(),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "Database error occurred"
            }
            AppError::ClassificationFailed(msg) => {
                tracing::error!("Prediction error: {}", msg);
                msg.as_str()
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error"
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::NoFile
            | ClassifierError::EmptyFilename
            | ClassifierError::UnsupportedExtension(_) => AppError::ValidationError(err.to_string()),
            ClassifierError::ImageDecode(detail) => {
                tracing::warn!("Image preprocessing error: {}", detail);
                AppError::ValidationError("Failed to process image".to_string())
            }
            other => AppError::ClassificationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_errors_are_client_errors() {
        for err in [
            ClassifierError::NoFile,
            ClassifierError::EmptyFilename,
            ClassifierError::UnsupportedExtension("notes.txt".to_string()),
            ClassifierError::ImageDecode("bad header".to_string()),
        ] {
            assert_eq!(AppError::from(err).status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_decode_failure_message_is_generic() {
        match AppError::from(ClassifierError::ImageDecode("truncated png".to_string())) {
            AppError::ValidationError(msg) => assert_eq!(msg, "Failed to process image"),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_classification_failure_surfaces_message() {
        let err = AppError::from(ClassifierError::EmptyCatalog);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            AppError::ClassificationFailed(msg) => assert!(msg.contains("label")),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }
}

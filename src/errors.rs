use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{ErrorCategory, files::FileError, upload::UploadError};

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

/// Map a service-layer category onto an HTTP status. The services never see
/// HTTP types; this is the single place where the translation happens.
fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::BadRequest => StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCategory::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::new(status_for(err.category()), err.to_string())
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        AppError::new(status_for(err.category()), err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::keys::validate_key;

    #[test]
    fn upload_errors_map_to_expected_statuses() {
        let cases: [(UploadError, StatusCode); 4] = [
            (UploadError::MissingFilename, StatusCode::BAD_REQUEST),
            (
                UploadError::TooLarge("100.0 MB".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                UploadError::TypeNotAllowed("text/html".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (UploadError::EmptyFile, StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn file_errors_map_to_expected_statuses() {
        let invalid = validate_key("nope").unwrap_err();
        assert_eq!(
            AppError::from(FileError::InvalidKey(invalid)).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(FileError::NotFound).status,
            StatusCode::NOT_FOUND
        );
    }
}

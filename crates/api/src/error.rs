use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use vocalstrip_core::error::UploadError;
use vocalstrip_core::separation::SeparationError;

/// Generic message for any server-side failure of the separation pipeline.
pub const SEPARATION_FAILED: &str = "Demucs separation failed.";

/// Message when the tool exits cleanly but the expected stem is absent.
pub const OUTPUT_NOT_FOUND: &str = "Output file not found after separation.";

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{"error": ..}` bodies, with a
/// `details` field on server errors that carry diagnostic text.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The upload itself was unacceptable.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Broken multipart framing or an oversized body.
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// The separation tool could not be run, failed, or produced nothing.
    #[error(transparent)]
    Separation(#[from] SeparationError),

    /// Filesystem failure while staging, preparing or streaming.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Upload(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            AppError::Multipart(err) => (err.status(), err.body_text(), None),
            AppError::Separation(SeparationError::OutputMissing(path)) => {
                tracing::error!(path = %path.display(), "Separation output missing");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    OUTPUT_NOT_FOUND.to_string(),
                    None,
                )
            }
            AppError::Separation(err) => {
                tracing::error!(error = %err, "Separation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SEPARATION_FAILED.to_string(),
                    Some(err.to_string()),
                )
            }
            AppError::Io(err) => {
                tracing::error!(error = %err, "I/O error during separation request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SEPARATION_FAILED.to_string(),
                    Some(err.to_string()),
                )
            }
        };

        (status, axum::Json(ErrorBody { error, details })).into_response()
    }
}

//! Domain error types for the socialshot server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::services::capture::CaptureError;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data (missing/malformed URL, selector, channel name)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Duplicate channel name or duplicate link URL within a channel
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Browser automation failure, carrying the distinguishing sub-kind
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// Storage (S3) operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Image decode/encode failed
    #[error("Image error: {0}")]
    Image(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code, response_message) = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::NotFound(_) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                self.to_string(),
            ),
            AppError::Validation(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                self.to_string(),
            ),
            AppError::Conflict(_) => (
                actix_web::http::StatusCode::CONFLICT,
                "CONFLICT",
                self.to_string(),
            ),
            AppError::Capture(err) => {
                // Operators need to tell "page never loaded" from "selector
                // never appeared" from "the channel's bypass script is broken".
                let (status, code) = match err {
                    CaptureError::SelectorNotFound { .. } => (
                        actix_web::http::StatusCode::NOT_FOUND,
                        "SELECTOR_NOT_FOUND",
                    ),
                    CaptureError::Navigation { .. } => {
                        (actix_web::http::StatusCode::BAD_GATEWAY, "NAVIGATION_FAILED")
                    }
                    CaptureError::BypassScript(_) => (
                        actix_web::http::StatusCode::UNPROCESSABLE_ENTITY,
                        "BYPASS_SCRIPT_ERROR",
                    ),
                    CaptureError::LinkBusy(_) => {
                        (actix_web::http::StatusCode::CONFLICT, "CAPTURE_IN_FLIGHT")
                    }
                    CaptureError::Session(_) => (
                        actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                        "BROWSER_SESSION_ERROR",
                    ),
                };
                (status, code, self.to_string())
            }
            AppError::Storage(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                self.to_string(),
            ),
            AppError::Image(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "IMAGE_ERROR",
                self.to_string(),
            ),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("Invalid UUID: {}", err))
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn test_capture_errors_map_to_distinct_statuses() {
        let selector = AppError::Capture(CaptureError::SelectorNotFound {
            selector: "div[role=article]".to_string(),
            timeout_secs: 60,
        });
        let navigation = AppError::Capture(CaptureError::Navigation {
            url: "https://example.com".to_string(),
            reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        });
        let bypass = AppError::Capture(CaptureError::BypassScript("boom".to_string()));
        let busy = AppError::Capture(CaptureError::LinkBusy("facebook/x".to_string()));

        assert_eq!(selector.error_response().status().as_u16(), 404);
        assert_eq!(navigation.error_response().status().as_u16(), 502);
        assert_eq!(bypass.error_response().status().as_u16(), 422);
        assert_eq!(busy.error_response().status().as_u16(), 409);
    }

    #[test]
    fn test_not_found_and_conflict_statuses() {
        assert_eq!(
            AppError::NotFound("Channel facebook".to_string())
                .error_response()
                .status()
                .as_u16(),
            404
        );
        assert_eq!(
            AppError::Conflict("URL already exists".to_string())
                .error_response()
                .status()
                .as_u16(),
            409
        );
    }
}

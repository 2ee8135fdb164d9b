use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image host error: {0}")]
    Media(#[from] reqwest::Error),

    #[error("Image host not configured")]
    MediaUnavailable,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource already exists: {0}")]
    Duplicate(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Environment variable missing: {0}")]
    MissingEnvVar(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string(), "VALIDATION"),
            AppError::Duplicate(_) => (StatusCode::CONFLICT, self.to_string(), "DUPLICATE"),
            AppError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, self.to_string(), "UNAUTHORIZED")
            }
            AppError::MediaUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                self.to_string(),
                "MEDIA_UNAVAILABLE",
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    "DATABASE_ERROR",
                )
            }
            AppError::Media(e) => {
                tracing::error!("Image host error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Image host error occurred".to_string(),
                    "MEDIA_ERROR",
                )
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Data serialization error".to_string(),
                    "SERIALIZATION_ERROR",
                )
            }
            _ => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        // Full error text only in debug builds; release responses stay generic
        let body = if cfg!(debug_assertions) && status == StatusCode::INTERNAL_SERVER_ERROR {
            json!({
                "error": error_code,
                "message": error_message,
                "detail": self.to_string(),
            })
        } else {
            json!({
                "error": error_code,
                "message": error_message,
            })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for AppResult
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("product abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError::Validation("price must be positive".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_maps_to_409() {
        let response = AppError::Duplicate("slug".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_media_unavailable_maps_to_503() {
        let response = AppError::MediaUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_maps_to_500() {
        let response = AppError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

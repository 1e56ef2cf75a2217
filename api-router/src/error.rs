use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_typed_multipart::TypedMultipartError;
use common::{
    error::AppError,
    storage::{blob::StorageError, catalog::CatalogError},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::Catalog(CatalogError::NotFound) => Self::NotFound("record not found".into()),
            AppError::Storage(StorageError::LinkExpired | StorageError::InvalidSignature) => {
                Self::Forbidden("link is invalid or has expired".into())
            }
            AppError::Storage(StorageError::Backend(object_store::Error::NotFound { .. })) => {
                Self::NotFound("object not found".into())
            }
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<TypedMultipartError> for ApiError {
    fn from(err: TypedMultipartError) -> Self {
        match err.get_status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                Self::PayloadTooLarge("upload exceeds the size limit".into())
            }
            status if status.is_server_error() => {
                tracing::error!("Failed to read multipart upload: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
            _ => Self::ValidationError(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            Self::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
        };

        let error_response = ErrorResponse {
            error: message,
            status: "error".to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fmt::Debug, time::Duration};

    // Helper to check status code
    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn test_app_error_to_api_error_conversion() {
        let not_found = AppError::NotFound("collection not found".to_string());
        let api_error = ApiError::from(not_found);
        assert!(matches!(api_error, ApiError::NotFound(msg) if msg == "collection not found"));

        let validation = AppError::Validation("invalid input".to_string());
        let api_error = ApiError::from(validation);
        assert!(matches!(api_error, ApiError::ValidationError(msg) if msg == "invalid input"));

        let missing_row = AppError::Catalog(CatalogError::NotFound);
        assert!(matches!(ApiError::from(missing_row), ApiError::NotFound(_)));

        let expired = AppError::Storage(StorageError::LinkExpired);
        assert!(matches!(ApiError::from(expired), ApiError::Forbidden(_)));

        let missing_object = AppError::Storage(StorageError::Backend(
            object_store::Error::NotFound {
                path: "abc".into(),
                source: "missing".into(),
            },
        ));
        assert!(matches!(
            ApiError::from(missing_object),
            ApiError::NotFound(_)
        ));

        let internal_error =
            AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "io error"));
        let api_error = ApiError::from(internal_error);
        assert!(matches!(api_error, ApiError::InternalError(_)));
    }

    #[test]
    fn test_store_failures_are_sanitized() {
        let timeout = AppError::Storage(StorageError::Timeout {
            operation: "put_object",
            timeout: Duration::from_secs(10),
        });
        assert!(matches!(
            ApiError::from(timeout),
            ApiError::InternalError(msg) if msg == "Internal server error"
        ));

        let catalog = AppError::Catalog(CatalogError::Other(
            "connection to db.internal:8000 refused".into(),
        ));
        let api_error = ApiError::from(catalog);
        assert_eq!(api_error.to_string(), "Internal server error");
        assert!(matches!(api_error, ApiError::InternalError(msg) if !msg.contains("db.internal")));
    }

    #[test]
    fn test_multipart_rejections_map_to_client_errors() {
        let missing = TypedMultipartError::MissingField {
            field_name: "file".into(),
        };
        assert!(matches!(
            ApiError::from(missing),
            ApiError::ValidationError(msg) if msg.contains("file")
        ));

        let too_large = TypedMultipartError::FieldTooLarge {
            field_name: "file".into(),
            limit_bytes: 1024,
        };
        assert!(matches!(
            ApiError::from(too_large),
            ApiError::PayloadTooLarge(_)
        ));
    }

    #[test]
    fn test_api_error_response_status_codes() {
        assert_status_code(
            ApiError::InternalError("server error".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        assert_status_code(
            ApiError::NotFound("not found".to_string()),
            StatusCode::NOT_FOUND,
        );
        assert_status_code(
            ApiError::ValidationError("invalid input".to_string()),
            StatusCode::BAD_REQUEST,
        );
        assert_status_code(
            ApiError::Forbidden("expired".to_string()),
            StatusCode::FORBIDDEN,
        );
        assert_status_code(
            ApiError::PayloadTooLarge("too big".to_string()),
            StatusCode::PAYLOAD_TOO_LARGE,
        );
    }

    #[test]
    fn test_error_messages() {
        let message = "invalid data format";
        let error = ApiError::ValidationError(message.to_string());
        assert_eq!(error.to_string(), format!("Validation error: {}", message));

        let message = "collection not found";
        let error = ApiError::NotFound(message.to_string());
        assert_eq!(error.to_string(), format!("Not found: {}", message));
    }
}

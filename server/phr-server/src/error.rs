use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::tokens::TokenError;
use crate::services::file_storage::StorageError;
use crate::services::pdf::PdfError;
use crate::storage::StoreError;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type/code
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Response metadata for offset pagination
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    pub skip: i64,
    pub limit: i64,
    pub returned: usize,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{message}")]
    Authentication { message: String },

    #[error("{message}")]
    Authorization { message: String },

    #[error("{resource_type} not found")]
    NotFound { resource_type: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Storage failure: {message}")]
    Storage { message: String },

    #[error("Unprocessable entity: {message}")]
    UnprocessableEntity { message: String },
}

impl ApiError {
    /// Malformed or out-of-range input
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::UnprocessableEntity {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } | ApiError::Storage { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Internal { .. } => "internal_error",
            ApiError::Storage { .. } => "storage_failure",
            ApiError::UnprocessableEntity { .. } => "unprocessable_entity",
        }
    }

    /// Get suggested actions for resolving the error
    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Validation { .. } => Some(vec![
                "Check the request payload for out-of-range values".to_string(),
                "Ensure all required fields are provided".to_string(),
            ]),
            ApiError::Authentication { .. } => Some(vec![
                "Send a valid access token as 'Authorization: Bearer <token>'".to_string(),
                "Log in again or use the refresh token if the access token has expired".to_string(),
            ]),
            ApiError::Authorization { .. } => Some(vec![
                "Verify your role allows this operation".to_string(),
                "Records can only be accessed by their owner or an assigned doctor".to_string(),
            ]),
            ApiError::NotFound { .. } => Some(vec!["Verify the resource ID is correct".to_string()]),
            ApiError::UnprocessableEntity { .. } => Some(vec![
                "Check the request body is well-formed JSON".to_string(),
                "Remove fields the endpoint does not accept".to_string(),
            ]),
            _ => None,
        }
    }

    fn is_server_side(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if self.is_server_side() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        // Internal details stay in the log
        let message = match &self {
            ApiError::Internal { .. } => "An unexpected error occurred".to_string(),
            ApiError::Storage { .. } => "A storage operation failed".to_string(),
            _ => self.to_string(),
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            message,
            timestamp: chrono::Utc::now(),
            suggestions: self.suggestions(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

/// Helper function to create successful API responses with metadata
pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: Some(metadata),
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(resource) => ApiError::not_found(resource),
            StoreError::Conflict(message) => ApiError::conflict(message),
            StoreError::Database(e) => ApiError::internal(format!("database error: {e}")),
            StoreError::Corrupt(message) => ApiError::internal(message),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken | TokenError::ExpiredToken | TokenError::MalformedToken | TokenError::WrongKind => {
                ApiError::authentication(err.to_string())
            }
            TokenError::Encoding(message) | TokenError::Configuration(message) => ApiError::internal(message),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DisallowedExtension { .. } | StorageError::TooLarge { .. } | StorageError::EmptyFile => {
                ApiError::validation(err.to_string())
            }
            StorageError::Io(_) | StorageError::InvalidPath(_) => ApiError::Storage {
                message: err.to_string(),
            },
        }
    }
}

impl From<PdfError> for ApiError {
    fn from(err: PdfError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<crypto::CryptoError> for ApiError {
    fn from(err: crypto::CryptoError) -> Self {
        ApiError::internal(format!("field encryption error: {err}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::unprocessable(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::unprocessable(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::unprocessable(format!("Invalid multipart payload: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_error_taxonomy() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::authentication("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::authorization("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("Health log").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::unprocessable("x").status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_types_are_stable() {
        assert_eq!(ApiError::validation("x").error_type(), "validation_error");
        assert_eq!(ApiError::authentication("x").error_type(), "authentication_error");
        assert_eq!(ApiError::authorization("x").error_type(), "authorization_error");
        assert_eq!(ApiError::not_found("Report").error_type(), "not_found");
        assert_eq!(ApiError::conflict("x").error_type(), "conflict");
        assert_eq!(ApiError::unprocessable("x").error_type(), "unprocessable_entity");
        assert_eq!(ApiError::internal("x").error_type(), "internal_error");
    }

    #[test]
    fn test_not_found_message_names_resource() {
        assert_eq!(ApiError::not_found("Health report").to_string(), "Health report not found");
    }

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: ApiError = StoreError::Conflict("Email already registered".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_expired_token_maps_to_unauthorized() {
        let err: ApiError = TokenError::ExpiredToken.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}

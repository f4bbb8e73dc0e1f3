//! Server error types.

use api_protocol::{error_codes, ErrorResponse};
use auth::AuthError;
use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use record_store::StoreError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication required.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The request was based on a stale version of the record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ServerError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, error_codes::INVALID_REQUEST)
            }
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::RESOURCE_NOT_FOUND),
            ServerError::AuthenticationRequired => {
                (StatusCode::UNAUTHORIZED, error_codes::AUTHENTICATION_REQUIRED)
            }
            ServerError::PermissionDenied(_) => {
                (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED)
            }
            ServerError::Conflict(_) => (StatusCode::CONFLICT, error_codes::VERSION_CONFLICT),
            ServerError::Store(e) => match e {
                StoreError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, error_codes::RESOURCE_NOT_FOUND)
                }
                StoreError::DuplicateKey { .. } => {
                    (StatusCode::BAD_REQUEST, error_codes::ALREADY_EXISTS)
                }
                StoreError::VersionConflict { .. } => {
                    (StatusCode::CONFLICT, error_codes::VERSION_CONFLICT)
                }
                StoreError::Database(_) | StoreError::Serialization(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
                }
            },
            ServerError::Auth(e) => match e {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, error_codes::INVALID_CREDENTIALS)
                }
                AuthError::Forbidden { .. } => {
                    (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED)
                }
                AuthError::JwtEncoding(_) | AuthError::PasswordHash(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
                }
                AuthError::JwtValidation(_) | AuthError::TokenExpired | AuthError::InvalidToken => {
                    (StatusCode::UNAUTHORIZED, error_codes::AUTHENTICATION_REQUIRED)
                }
            },
        }
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        let message = match &self {
            ServerError::InvalidRequest(msg)
            | ServerError::NotFound(msg)
            | ServerError::PermissionDenied(msg)
            | ServerError::Conflict(msg) => msg.clone(),
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ServerError {
    fn from(rejection: FormRejection) -> Self {
        ServerError::InvalidRequest(rejection.body_text())
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

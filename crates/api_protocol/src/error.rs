//! Error envelope.

use serde::{Deserialize, Serialize};

/// Machine-readable error codes carried in [`ErrorBody::code`].
pub mod error_codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const AUTHENTICATION_REQUIRED: &str = "authentication_required";
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    pub const PERMISSION_DENIED: &str = "permission_denied";
    pub const RESOURCE_NOT_FOUND: &str = "resource_not_found";
    pub const ALREADY_EXISTS: &str = "already_exists";
    pub const VERSION_CONFLICT: &str = "version_conflict";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Error details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Body of every non-2xx response: `{"error": {"code", "message"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

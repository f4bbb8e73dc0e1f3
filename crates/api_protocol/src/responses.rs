//! REST response types.

use entities::{StageOption, User};
use serde::{Deserialize, Serialize};

/// `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

// ============================================================================
// Auth Service Responses
// ============================================================================

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: u64, user: UserResponse) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
            user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChangedResponse {
    pub detail: String,
}

// ============================================================================
// Settings Service Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOptionsListResponse {
    pub items: Vec<StageOption>,
}

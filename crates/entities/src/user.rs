//! User-related entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role that unlocks administrative operations.
pub const ADMIN_ROLE: &str = "admin";

/// Role given to users who register without one.
pub const DEFAULT_ROLE: &str = "engineer";

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, `0` until inserted.
    pub id: i64,
    /// Email address, unique and case-sensitive as stored.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Free-form role; only `admin` carries meaning.
    pub role: String,
    /// Opaque password hash.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user named after its email with the default role.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: 0,
            name: email.clone(),
            email,
            role: DEFAULT_ROLE.to_string(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Returns true if the role is exactly `admin`.
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("test@example.com", "hash");

        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.name, "test@example.com");
        assert_eq!(user.role, DEFAULT_ROLE);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_admin_role_is_exact() {
        assert!(User::new("a@b.c", "h").with_role("admin").is_admin());
        assert!(!User::new("a@b.c", "h").with_role("Admin").is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@b.c", "secret-hash").with_name("A");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}

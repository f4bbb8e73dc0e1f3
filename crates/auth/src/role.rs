//! Role checks.

use entities::ADMIN_ROLE;

use crate::{AuthError, AuthResult};

/// Fails with `Forbidden` unless `actual` is exactly `required`.
///
/// Roles are free-form strings; comparison is case-sensitive.
pub fn require_role(actual: &str, required: &str) -> AuthResult<()> {
    if actual == required {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            required: required.to_string(),
        })
    }
}

/// Shorthand for `require_role(actual, ADMIN_ROLE)`.
pub fn require_admin(actual: &str) -> AuthResult<()> {
    require_role(actual, ADMIN_ROLE)
}

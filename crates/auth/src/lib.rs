//! Credential handling for the defect tracker.
//!
//! This crate provides:
//! - JWT token generation and validation (subject = user email)
//! - argon2id password hashing
//! - Role checks for administrative operations

mod error;
mod jwt;
mod password;
mod role;

pub use error::*;
pub use jwt::*;
pub use password::*;
pub use role::*;

/// Default JWT expiration time in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "tracker";

//! Server configuration.

use std::env;

/// `DATABASE_URL` value that selects the in-memory store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database URL, or `memory`.
    pub database_url: String,
    /// Secret used to sign access tokens.
    pub jwt_secret: String,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// Issuer stamped into and required from access tokens.
    pub jwt_issuer: String,
    /// Email of the admin created at startup.
    pub admin_email: Option<String>,
    /// Password of the admin created at startup.
    pub admin_password: Option<String>,
    /// Log level.
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("TRACKER_JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| anyhow::anyhow!("TRACKER_JWT_SECRET is required"))?;

        let port = match lookup("TRACKER_SERVER_PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("TRACKER_SERVER_PORT is not a valid port: {port}"))?,
            None => 8080,
        };

        Ok(Self {
            host: lookup("TRACKER_SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:tracker.db?mode=rwc".to_string()),
            jwt_secret,
            jwt_expiration_hours: lookup("TRACKER_JWT_EXPIRATION_HOURS")
                .and_then(|hours| hours.parse().ok())
                .unwrap_or(auth::DEFAULT_JWT_EXPIRATION_HOURS),
            jwt_issuer: lookup("TRACKER_JWT_ISSUER")
                .filter(|issuer| !issuer.is_empty())
                .unwrap_or_else(|| auth::DEFAULT_JWT_ISSUER.to_string()),
            admin_email: lookup("TRACKER_ADMIN_EMAIL").filter(|v| !v.is_empty()),
            admin_password: lookup("TRACKER_ADMIN_PASSWORD").filter(|v| !v.is_empty()),
            log_level: lookup("TRACKER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if records should be kept in memory only.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    /// Bootstrap admin credentials, when both are configured.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

//! Defect tracker server.
//!
//! Hosts the auth, defects, projects and settings services in one process,
//! each under its own path prefix, on top of a shared record store.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use auth::{JwtConfig, JwtManager};
use axum::Router;
use entities::{ADMIN_ROLE, User};
use record_store::{RecordStore, StoreError};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::ServerResult;
use crate::state::{AppState, create_shared_state};

/// Display name given to the admin created at startup.
pub const BOOTSTRAP_ADMIN_NAME: &str = "Главный админ";

/// Creates the application router with all routes configured.
pub fn create_app<S: RecordStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::create_router(state.clone())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Creates the application state with the given configuration and store.
pub fn create_state<S: RecordStore>(config: Config, store: S) -> Arc<AppState<S>> {
    let jwt_config = JwtConfig::new(&config.jwt_secret)
        .with_expiration_hours(config.jwt_expiration_hours)
        .with_issuer(&config.jwt_issuer);

    create_shared_state(config, store, JwtManager::new(jwt_config))
}

/// Creates the configured admin account if it does not exist yet.
///
/// Returns the created user, or `None` when nothing was configured or the
/// email is already registered.
pub async fn bootstrap_admin<S: RecordStore>(state: &AppState<S>) -> ServerResult<Option<User>> {
    let Some((email, password)) = state.config.admin_credentials() else {
        return Ok(None);
    };

    if state.store.get_user_by_email(email).await?.is_some() {
        tracing::debug!(email, "Bootstrap admin already exists");
        return Ok(None);
    }

    let password_hash = state.password_hasher.hash(password)?;
    let admin = User::new(email, password_hash)
        .with_name(BOOTSTRAP_ADMIN_NAME)
        .with_role(ADMIN_ROLE);

    match state.store.insert_user(admin).await {
        Ok(admin) => {
            tracing::info!(user_id = admin.id, email, "Bootstrap admin created");
            Ok(Some(admin))
        }
        Err(StoreError::DuplicateKey { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

//! Application state.

use std::sync::Arc;

use auth::{JwtManager, PasswordHasher};
use record_store::RecordStore;

use crate::config::Config;

/// Shared application state.
pub struct AppState<S: RecordStore> {
    /// Server configuration.
    pub config: Config,
    /// Record store.
    pub store: S,
    /// Issues and validates access tokens.
    pub jwt_manager: JwtManager,
    /// Hashes and verifies passwords.
    pub password_hasher: PasswordHasher,
}

impl<S: RecordStore> AppState<S> {
    /// Creates new application state.
    pub fn new(config: Config, store: S, jwt_manager: JwtManager) -> Self {
        Self {
            config,
            store,
            jwt_manager,
            password_hasher: PasswordHasher::new(),
        }
    }
}

/// Type alias for shared state.
pub type SharedState<S> = Arc<AppState<S>>;

/// Creates shared state from config and store.
pub fn create_shared_state<S: RecordStore>(
    config: Config,
    store: S,
    jwt_manager: JwtManager,
) -> SharedState<S> {
    Arc::new(AppState::new(config, store, jwt_manager))
}

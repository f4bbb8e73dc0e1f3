//! Authentication middleware.

use std::sync::Arc;

use auth::{extract_bearer, Claims};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use record_store::RecordStore;

use crate::error::ServerError;
use crate::state::AppState;

/// Principal resolved from a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Email the token was issued to.
    pub email: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.email().to_string(),
        }
    }
}

/// Extracts the JWT token from the Authorization header.
fn extract_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer)
}

/// Authentication middleware.
///
/// Validates the bearer token and stores the [`AuthenticatedUser`] in the
/// request extensions. Requests without a valid token are answered with 401.
pub async fn auth_middleware<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(&request) else {
        return ServerError::AuthenticationRequired.into_response();
    };

    let claims = match state.jwt_manager.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return ServerError::Auth(e).into_response();
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    next.run(request).await
}

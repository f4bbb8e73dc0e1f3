//! Authentication and user management endpoints.

use std::sync::Arc;

use api_protocol::{
    LoginRequest, PasswordChangeRequest, PasswordChangedResponse, ProfileUpdateRequest,
    RegisterRequest, RoleUpdateRequest, TokenResponse, UserListResponse, UserResponse,
};
use auth::{AuthError, require_admin};
use axum::{
    Extension, Form, Json,
    extract::{
        Path, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
};
use entities::{ADMIN_ROLE, DEFAULT_ROLE, User};
use record_store::{ListOrder, RecordStore};

use super::require_text;
use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Loads the user behind a validated token.
///
/// A token for a user deleted since issuance is treated as unauthenticated.
async fn current_user<S: RecordStore>(
    state: &AppState<S>,
    principal: &AuthenticatedUser,
) -> ServerResult<User> {
    state
        .store
        .get_user_by_email(&principal.email)
        .await?
        .ok_or(ServerError::AuthenticationRequired)
}

/// Registers a user and returns its ID.
///
/// Self-registration can pick any role except `admin`.
pub async fn register<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<i64>)> {
    let Json(request) = payload?;

    require_text("username", &request.username)?;
    require_text("password", &request.password)?;

    let role = request
        .role
        .filter(|role| !role.is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());
    if role == ADMIN_ROLE {
        return Err(ServerError::PermissionDenied(
            "The admin role cannot be self-assigned".to_string(),
        ));
    }

    let password_hash = state.password_hasher.hash(&request.password)?;
    let mut user = User::new(request.username, password_hash).with_role(role);
    if let Some(name) = request.name.filter(|name| !name.is_empty()) {
        user = user.with_name(name);
    }

    let user = state.store.insert_user(user).await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok((StatusCode::CREATED, Json(user.id)))
}

/// Exchanges a username and password for a bearer token.
pub async fn login<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Form<LoginRequest>, FormRejection>,
) -> ServerResult<Json<TokenResponse>> {
    let Form(request) = payload?;

    let user = state
        .store
        .get_user_by_email(&request.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !state
        .password_hasher
        .verify(&request.password, &user.password_hash)?
    {
        tracing::info!(user_id = user.id, "Login rejected");
        return Err(AuthError::InvalidCredentials.into());
    }

    let access_token = state.jwt_manager.generate_token(&user.email)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(TokenResponse::bearer(
        access_token,
        state.jwt_manager.expiration_seconds(),
        user.into(),
    )))
}

/// Gets the current user.
pub async fn get_me<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<AuthenticatedUser>,
) -> ServerResult<Json<UserResponse>> {
    let user = current_user(&state, &principal).await?;
    Ok(Json(user.into()))
}

/// Updates the current user's name and, for admins, role.
pub async fn update_me<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<AuthenticatedUser>,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> ServerResult<Json<UserResponse>> {
    let Json(request) = payload?;

    let mut user = current_user(&state, &principal).await?;

    if let Some(role) = request.role {
        if role != user.role {
            require_admin(&user.role)?;
            user.role = role;
        }
    }
    if let Some(name) = request.name {
        user.name = name;
    }

    let user = state.store.update_user(user).await?;

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(user.into()))
}

pub async fn change_password<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<AuthenticatedUser>,
    payload: Result<Json<PasswordChangeRequest>, JsonRejection>,
) -> ServerResult<Json<PasswordChangedResponse>> {
    let Json(request) = payload?;

    require_text("new_password", &request.new_password)?;

    let mut user = current_user(&state, &principal).await?;

    if !state
        .password_hasher
        .verify(&request.old_password, &user.password_hash)?
    {
        return Err(ServerError::InvalidRequest(
            "Incorrect old password".to_string(),
        ));
    }

    user.password_hash = state.password_hasher.hash(&request.new_password)?;
    let user = state.store.update_user(user).await?;

    tracing::info!(user_id = user.id, "Password changed");

    Ok(Json(PasswordChangedResponse {
        detail: "Password updated".to_string(),
    }))
}

/// Deletes the current user.
pub async fn delete_me<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<AuthenticatedUser>,
) -> ServerResult<StatusCode> {
    let user = current_user(&state, &principal).await?;
    state.store.delete_user(user.id).await?;

    tracing::info!(user_id = user.id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Lists every user. Admin only.
pub async fn list_users<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<AuthenticatedUser>,
) -> ServerResult<Json<UserListResponse>> {
    let caller = current_user(&state, &principal).await?;
    require_admin(&caller.role)?;

    let users = state.store.list_users(ListOrder::Ascending).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// Reassigns another user's role. Admin only.
pub async fn update_user_role<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    payload: Result<Json<RoleUpdateRequest>, JsonRejection>,
) -> ServerResult<Json<UserResponse>> {
    let Json(request) = payload?;

    let caller = current_user(&state, &principal).await?;
    require_admin(&caller.role)?;
    require_text("role", &request.role)?;

    let mut user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("User {id} not found")))?;

    user.role = request.role;
    let user = state.store.update_user(user).await?;

    tracing::info!(user_id = id, role = %user.role, changed_by = caller.id, "Role updated");

    Ok(Json(user.into()))
}

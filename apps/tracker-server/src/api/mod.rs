//! API endpoints.

pub mod auth;
pub mod defects;
pub mod projects;
pub mod settings;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
};
use api_protocol::HealthResponse;
use record_store::RecordStore;

use crate::error::{ServerError, ServerResult};
use crate::middleware::auth_middleware;
use crate::state::SharedState;

/// Creates the API router with all endpoints.
///
/// Each service keeps its own path prefix so existing clients can switch to
/// the combined process without changing URLs.
pub fn create_router<S: RecordStore + 'static>(state: SharedState<S>) -> Router<SharedState<S>> {
    Router::new()
        .route("/", get(health_check))
        .nest("/auth_service", auth_routes(state))
        .nest("/defects_service", defect_routes())
        .nest("/projects_service", project_routes())
        .nest("/settings_service", settings_routes())
}

fn auth_routes<S: RecordStore + 'static>(state: SharedState<S>) -> Router<SharedState<S>> {
    let protected = Router::new()
        .route(
            "/me",
            get(auth::get_me).put(auth::update_me).delete(auth::delete_me),
        )
        .route("/me/password", put(auth::change_password))
        .route("/users", get(auth::list_users))
        .route("/users/:id/role", put(auth::update_user_role))
        .route_layer(from_fn_with_state(state, auth_middleware::<S>));

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected)
}

fn defect_routes<S: RecordStore + 'static>() -> Router<SharedState<S>> {
    Router::new()
        .route("/defects", get(defects::list_defects).post(defects::create_defect))
        .route("/defects/stats", get(defects::get_stats))
        .route(
            "/defects/:id",
            get(defects::get_defect)
                .patch(defects::update_defect)
                .delete(defects::delete_defect),
        )
        .route("/defects/:id/status", patch(defects::update_status))
        .route("/defects/:id/comments", post(defects::add_comment))
        .route("/defects/:id/attachments", post(defects::add_attachments))
        .route(
            "/defects/:id/attachments/:name",
            delete(defects::remove_attachment),
        )
}

fn project_routes<S: RecordStore + 'static>() -> Router<SharedState<S>> {
    Router::new()
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:id/stages", post(projects::add_stage))
        .route(
            "/projects/:id/stages/:stage_id",
            delete(projects::remove_stage),
        )
        .route("/projects/:id/attachments", post(projects::add_attachments))
        .route(
            "/projects/:id/attachments/:name",
            delete(projects::remove_attachment),
        )
}

fn settings_routes<S: RecordStore + 'static>() -> Router<SharedState<S>> {
    Router::new()
        .route(
            "/settings/stages",
            get(settings::list_stage_options).post(settings::add_stage_option),
        )
        .route("/settings/stages/reset", post(settings::reset_stage_options))
        .route(
            "/settings/stages/:name",
            delete(settings::delete_stage_option),
        )
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "tracker".to_string(),
    })
}

/// Rejects a blank required text field.
fn require_text(field: &str, value: &str) -> ServerResult<()> {
    if value.trim().is_empty() {
        return Err(ServerError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Rejects a request that names a version other than the stored one.
fn ensure_version(
    entity_type: &str,
    id: i64,
    stored: i64,
    expected: Option<i64>,
) -> ServerResult<()> {
    match expected {
        Some(expected) if expected != stored => Err(ServerError::Conflict(format!(
            "{entity_type} {id} is at version {stored}, request expected {expected}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text("title", "X").is_ok());
        assert!(require_text("title", "   ").is_err());
    }

    #[test]
    fn test_ensure_version() {
        assert!(ensure_version("Defect", 1, 3, None).is_ok());
        assert!(ensure_version("Defect", 1, 3, Some(3)).is_ok());
        assert!(matches!(
            ensure_version("Defect", 1, 3, Some(2)),
            Err(ServerError::Conflict(_))
        ));
    }
}

//! Project API endpoints.

use std::sync::Arc;

use api_protocol::{
    AttachmentsAddRequest, CreateProjectRequest, StageAddRequest, UpdateProjectRequest,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use entities::Project;
use record_store::{ListOrder, RecordStore};

use super::{ensure_version, require_text};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

async fn load_project<S: RecordStore>(state: &AppState<S>, id: i64) -> ServerResult<Project> {
    state
        .store
        .get_project(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Project {id} not found")))
}

/// Lists projects, newest first.
pub async fn list_projects<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<Vec<Project>>> {
    let projects = state.store.list_projects(ListOrder::Descending).await?;
    Ok(Json(projects))
}

pub async fn get_project<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ServerResult<Json<Project>> {
    Ok(Json(load_project(&state, id).await?))
}

/// Creates a project.
pub async fn create_project<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Project>)> {
    let Json(request) = payload?;

    require_text("name", &request.name)?;

    let project = state.store.insert_project(Project::create(request)).await?;

    tracing::info!(project_id = project.id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ServerResult<Json<Project>> {
    let Json(request) = payload?;
    if let Some(name) = &request.patch.name {
        require_text("name", name)?;
    }

    let mut project = load_project(&state, id).await?;
    ensure_version("Project", id, project.version, request.version)?;

    project.apply_patch(request.patch);
    let project = state.store.update_project(project).await?;

    tracing::info!(project_id = id, version = project.version, "Project updated");

    Ok(Json(project))
}

/// Adds a stage. A title already present leaves the project unchanged.
pub async fn add_stage<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<StageAddRequest>, JsonRejection>,
) -> ServerResult<Json<Project>> {
    let Json(request) = payload?;

    require_text("title", &request.title)?;

    let mut project = load_project(&state, id).await?;
    if !project.add_stage(&request.title) {
        tracing::debug!(project_id = id, "Duplicate stage ignored");
        return Ok(Json(project));
    }

    let project = state.store.update_project(project).await?;

    tracing::info!(project_id = id, "Stage added");

    Ok(Json(project))
}

/// Removes a stage by ID. Unknown IDs leave the project unchanged.
pub async fn remove_stage<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, stage_id)): Path<(i64, i64)>,
) -> ServerResult<Json<Project>> {
    let mut project = load_project(&state, id).await?;
    if !project.remove_stage(stage_id) {
        return Ok(Json(project));
    }

    let project = state.store.update_project(project).await?;

    tracing::info!(project_id = id, stage_id, "Stage removed");

    Ok(Json(project))
}

pub async fn add_attachments<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<AttachmentsAddRequest>, JsonRejection>,
) -> ServerResult<Json<Project>> {
    let Json(request) = payload?;

    if request.files.is_empty() {
        return Err(ServerError::InvalidRequest(
            "files must not be empty".to_string(),
        ));
    }

    let mut project = load_project(&state, id).await?;
    let count = request.files.len();
    project.add_attachments(request.files);
    let project = state.store.update_project(project).await?;

    tracing::info!(project_id = id, count, "Attachments added");

    Ok(Json(project))
}

pub async fn remove_attachment<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, name)): Path<(i64, String)>,
) -> ServerResult<Json<Project>> {
    let mut project = load_project(&state, id).await?;
    if !project.remove_attachment(&name) {
        return Ok(Json(project));
    }

    let project = state.store.update_project(project).await?;

    tracing::info!(project_id = id, name = %name, "Attachment removed");

    Ok(Json(project))
}

/// Deletes a project together with its history.
pub async fn delete_project<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ServerResult<StatusCode> {
    state.store.delete_project(id).await?;

    tracing::info!(project_id = id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}

//! Defect API endpoints.
//!
//! Every mutation loads the defect, applies the change through an entity
//! method that also records history, and writes the record back in one store
//! update.

use std::sync::Arc;

use api_protocol::{
    AttachmentsAddRequest, CommentCreateRequest, CreateDefectRequest, StatusUpdateRequest,
    UpdateDefectRequest,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use entities::{Defect, DefectStats};
use record_store::{ListOrder, RecordStore};

use super::{ensure_version, require_text};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

async fn load_defect<S: RecordStore>(state: &AppState<S>, id: i64) -> ServerResult<Defect> {
    state
        .store
        .get_defect(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Defect {id} not found")))
}

/// Lists defects, newest first.
pub async fn list_defects<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<Vec<Defect>>> {
    let defects = state.store.list_defects(ListOrder::Descending).await?;
    Ok(Json(defects))
}

/// Counts all defects and the closed ones.
pub async fn get_stats<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<DefectStats>> {
    Ok(Json(state.store.defect_stats().await?))
}

/// Gets a defect by ID.
pub async fn get_defect<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ServerResult<Json<Defect>> {
    Ok(Json(load_defect(&state, id).await?))
}

/// Creates a defect.
pub async fn create_defect<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateDefectRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Defect>)> {
    let Json(request) = payload?;

    require_text("title", &request.title)?;

    let defect = state.store.insert_defect(Defect::create(request)).await?;

    tracing::info!(defect_id = defect.id, "Defect created");

    Ok((StatusCode::CREATED, Json(defect)))
}

/// Applies a partial update.
pub async fn update_defect<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateDefectRequest>, JsonRejection>,
) -> ServerResult<Json<Defect>> {
    let Json(request) = payload?;
    if let Some(title) = &request.patch.title {
        require_text("title", title)?;
    }

    let mut defect = load_defect(&state, id).await?;
    ensure_version("Defect", id, defect.version, request.version)?;

    defect.apply_patch(request.patch);
    let defect = state.store.update_defect(defect).await?;

    tracing::info!(defect_id = id, version = defect.version, "Defect updated");

    Ok(Json(defect))
}

/// Moves a defect to any status.
pub async fn update_status<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ServerResult<Json<Defect>> {
    let Json(request) = payload?;

    let mut defect = load_defect(&state, id).await?;
    ensure_version("Defect", id, defect.version, request.version)?;

    let from = defect.status.clone();
    defect.set_status(request.status);
    let defect = state.store.update_defect(defect).await?;

    tracing::info!(defect_id = id, from = %from, to = %defect.status, "Defect status changed");

    Ok(Json(defect))
}

pub async fn add_comment<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<CommentCreateRequest>, JsonRejection>,
) -> ServerResult<Json<Defect>> {
    let Json(request) = payload?;

    require_text("text", &request.text)?;

    let mut defect = load_defect(&state, id).await?;
    let comment_id = defect.add_comment(request.text).id;
    let defect = state.store.update_defect(defect).await?;

    tracing::info!(defect_id = id, comment_id, "Comment added");

    Ok(Json(defect))
}

/// Appends a batch of attachments under one history entry.
pub async fn add_attachments<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<AttachmentsAddRequest>, JsonRejection>,
) -> ServerResult<Json<Defect>> {
    let Json(request) = payload?;

    if request.files.is_empty() {
        return Err(ServerError::InvalidRequest(
            "files must not be empty".to_string(),
        ));
    }

    let mut defect = load_defect(&state, id).await?;
    let count = request.files.len();
    defect.add_attachments(request.files);
    let defect = state.store.update_defect(defect).await?;

    tracing::info!(defect_id = id, count, "Attachments added");

    Ok(Json(defect))
}

/// Removes attachments by name. Unknown names leave the defect unchanged.
pub async fn remove_attachment<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, name)): Path<(i64, String)>,
) -> ServerResult<Json<Defect>> {
    let mut defect = load_defect(&state, id).await?;
    if !defect.remove_attachment(&name) {
        return Ok(Json(defect));
    }

    let defect = state.store.update_defect(defect).await?;

    tracing::info!(defect_id = id, name = %name, "Attachment removed");

    Ok(Json(defect))
}

/// Deletes a defect together with its history.
pub async fn delete_defect<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> ServerResult<StatusCode> {
    state.store.delete_defect(id).await?;

    tracing::info!(defect_id = id, "Defect deleted");

    Ok(StatusCode::NO_CONTENT)
}

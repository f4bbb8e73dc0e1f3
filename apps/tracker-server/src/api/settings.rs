//! Stage option settings endpoints.

use std::sync::Arc;

use api_protocol::{StageOptionCreateRequest, StageOptionsListResponse};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use entities::{DEFAULT_STAGE_OPTIONS, StageOption};
use record_store::{ListOrder, RecordStore, StoreError};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Lists stage options, seeding the defaults into an empty list first.
pub async fn list_stage_options<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<StageOptionsListResponse>> {
    if state.store.count_stage_options().await? == 0 {
        let items = state
            .store
            .replace_stage_options(&DEFAULT_STAGE_OPTIONS)
            .await?;
        tracing::info!(count = items.len(), "Seeded default stage options");
        return Ok(Json(StageOptionsListResponse { items }));
    }

    let items = state.store.list_stage_options(ListOrder::Ascending).await?;
    Ok(Json(StageOptionsListResponse { items }))
}

/// Adds a stage option. An existing name returns the stored option.
pub async fn add_stage_option<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<StageOptionCreateRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<StageOption>)> {
    let Json(request) = payload?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Stage name must not be empty".to_string(),
        ));
    }

    if let Some(existing) = state.store.get_stage_option_by_name(name).await? {
        return Ok((StatusCode::CREATED, Json(existing)));
    }

    let option = match state.store.insert_stage_option(name).await {
        Ok(option) => option,
        // Lost a race with a concurrent insert of the same name.
        Err(StoreError::DuplicateKey { .. }) => state
            .store
            .get_stage_option_by_name(name)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Stage option {name} not found")))?,
        Err(e) => return Err(e.into()),
    };

    tracing::info!(stage_option_id = option.id, name = %option.name, "Stage option added");

    Ok((StatusCode::CREATED, Json(option)))
}

pub async fn delete_stage_option<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(name): Path<String>,
) -> ServerResult<StatusCode> {
    state.store.delete_stage_option(&name).await?;

    tracing::info!(name = %name, "Stage option deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Restores the default stage options.
pub async fn reset_stage_options<S: RecordStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<StageOptionsListResponse>> {
    let items = state
        .store
        .replace_stage_options(&DEFAULT_STAGE_OPTIONS)
        .await?;

    tracing::info!("Stage options reset to defaults");

    Ok(Json(StageOptionsListResponse { items }))
}

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::PlantStore;
use crate::models::*;
use crate::AppState;

use super::{created, refresh_snapshot, ApiError, PaginationQuery};

/// List fiber records (paginated)
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Vec<FiberRecord>>, ApiError> {
    let (limit, offset) = pagination.sanitize();
    let records = state.store.list_records(limit, offset).await?;
    Ok(Json(records))
}

/// Get a single fiber record by ID
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<FiberRecord>, ApiError> {
    let record = state
        .store
        .get_record(id)
        .await?
        .ok_or_else(|| ApiError::not_found("record"))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Search records by fiber name substring
pub async fn search_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FiberRecord>>, ApiError> {
    if query.q.trim().is_empty() {
        return Err(ApiError::bad_request("q is required"));
    }
    let records = state.store.search_records(query.q.trim()).await?;
    Ok(Json(records))
}

/// Create a new fiber record
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRecordRequest>,
) -> Result<(axum::http::StatusCode, Json<FiberRecord>), ApiError> {
    if req.station_name.trim().is_empty() {
        return Err(ApiError::bad_request("station_name is required"));
    }

    let record = state.store.create_record(&req.into_record()).await?;
    refresh_snapshot(&state).await;
    Ok(created(record))
}

/// Update an existing fiber record (full replace from the edit form)
pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CreateRecordRequest>,
) -> Result<Json<FiberRecord>, ApiError> {
    if req.station_name.trim().is_empty() {
        return Err(ApiError::bad_request("station_name is required"));
    }

    let existing = state
        .store
        .get_record(id)
        .await?
        .ok_or_else(|| ApiError::not_found("record"))?;

    let record = state
        .store
        .replace_record(id, &existing.partition_hint, &req)
        .await?;
    refresh_snapshot(&state).await;
    Ok(Json(record))
}

/// Delete a fiber record
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<axum::http::StatusCode, ApiError> {
    let existing = state
        .store
        .get_record(id)
        .await?
        .ok_or_else(|| ApiError::not_found("record"))?;

    state
        .store
        .delete_record(id, &existing.partition_hint)
        .await?;
    refresh_snapshot(&state).await;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

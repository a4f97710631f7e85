use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::engine::{self, CommitMeta, PathCandidate};
use crate::models::*;
use crate::AppState;

use super::{created, refresh_snapshot, ApiError};

/// Generate path candidates between two stations. Always searches against
/// a freshly loaded snapshot so the availability view cannot be stale.
pub async fn search_paths(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchPathsRequest>,
) -> Result<Json<Vec<PathCandidate>>, ApiError> {
    let snapshot = state.snapshot.refresh().await?;
    let candidates = engine::find_paths(&snapshot, &req.start, &req.end, req.core_count)?;
    Ok(Json(candidates))
}

/// Reserve one selected candidate. The engine re-validates the candidate
/// against current storage before writing anything.
pub async fn commit_path(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommitPathRequest>,
) -> Result<(axum::http::StatusCode, Json<CommitPathResponse>), ApiError> {
    if req.usage.trim().is_empty() {
        return Err(ApiError::bad_request("usage is required"));
    }

    let meta = CommitMeta {
        usage: req.usage,
        department: req.department,
        contact: req.contact,
        notes: req.notes,
    };
    let path_id = engine::commit_path(&state.store, &req.candidate, &meta).await?;
    refresh_snapshot(&state).await;
    Ok(created(CommitPathResponse { path_id }))
}

/// List committed paths, newest first
pub async fn list_paths(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PathHistoryEntry>>, ApiError> {
    let paths = state.store.list_path_history().await?;
    Ok(Json(paths))
}

/// Edit path metadata without touching the reserved records
pub async fn update_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePathRequest>,
) -> Result<Json<PathHistoryEntry>, ApiError> {
    if req.usage.trim().is_empty() {
        return Err(ApiError::bad_request("usage is required"));
    }
    let entry = state.store.update_path_history(&id, &req).await?;
    Ok(Json(entry))
}

/// Release a path: free or remove its reserved records, then drop the
/// history entry.
pub async fn release_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    if state.store.get_path_history(&id).await?.is_none() {
        return Err(ApiError::not_found("path"));
    }
    engine::release_path(&state.store, &id).await?;
    refresh_snapshot(&state).await;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

use axum::{extract::State, Json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::normalize::normalize_station;
use crate::models::StationStats;
use crate::AppState;

use super::{refresh_snapshot, ApiError};

/// Per-station core utilization, computed over the cached snapshot.
/// Stations are keyed by normalized name; the longest original spelling
/// observed is reported back, matching how the path engine labels nodes.
pub async fn station_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StationStats>>, ApiError> {
    refresh_snapshot(&state).await;
    let snapshot = state.snapshot.snapshot().await;

    let mut display: BTreeMap<String, String> = BTreeMap::new();
    let mut totals: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for record in snapshot.iter() {
        let key = normalize_station(&record.station_name);
        if key.is_empty() {
            continue;
        }
        let name = display.entry(key.clone()).or_default();
        if record.station_name.trim().len() > name.len() {
            *name = record.station_name.trim().to_string();
        }
        let entry = totals.entry(key).or_default();
        entry.0 += 1;
        if record.is_used() {
            entry.1 += 1;
        }
    }

    let stats = totals
        .into_iter()
        .map(|(key, (total, used))| StationStats {
            station_name: display.remove(&key).unwrap_or(key),
            total,
            used,
            free: total - used,
        })
        .collect();

    Ok(Json(stats))
}

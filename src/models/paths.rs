use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// PathHistoryEntry is the persisted record of a confirmed path. Its id is
/// the shared path identifier carried on every reserved fiber record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathHistoryEntry {
    pub id: String,
    pub start_station: String,
    pub end_station: String,
    /// Ordered normalized node list, stored as a JSON array column
    pub nodes: Vec<String>,
    pub usage: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub notes: String,
    pub core_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SearchPathsRequest carries the user's routing inputs
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPathsRequest {
    pub start: String,
    pub end: String,
    #[serde(default = "default_core_count")]
    pub core_count: usize,
}

fn default_core_count() -> usize {
    1
}

/// CommitPathRequest confirms one selected candidate with its metadata.
/// `usage` is mandatory; the rest is free text.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitPathRequest {
    pub candidate: crate::engine::PathCandidate,
    pub usage: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub notes: String,
}

/// CommitPathResponse returned on a successful reservation
#[derive(Debug, Clone, Serialize)]
pub struct CommitPathResponse {
    pub path_id: String,
}

/// UpdatePathRequest edits path metadata in place. Reservation state on the
/// underlying records is not touched.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePathRequest {
    pub usage: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub notes: String,
}

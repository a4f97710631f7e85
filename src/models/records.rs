use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// FiberRecord represents one core (or one unassigned slot) of one fiber
/// cable at one station. `id` is None for virtual rows that have not been
/// persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiberRecord {
    #[serde(default)]
    pub id: Option<i64>,
    /// Which storage partition the row lives in. Assigned by the name-based
    /// routing rule on create and carried through every later write.
    #[serde(default)]
    pub partition_hint: String,
    pub station_name: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub fiber_name: String,
    /// Core *number* within the fiber, string-encoded. Empty = unassigned.
    #[serde(default)]
    pub core_number: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub net_start: String,
    #[serde(default)]
    pub net_end: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub connection_line: String,
    /// Reference to the committed path this row is reserved for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<String>,
    /// In-memory flag for rows synthesized by passthrough injection.
    /// Never stored; a persisted virtual row is identified by source="AUTO".
    #[serde(default)]
    pub generated: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Source value written on records created by the path engine
pub const SOURCE_AUTO: &str = "AUTO";

impl FiberRecord {
    /// Occupancy predicate used by the dashboards: a record counts as used
    /// when any of usage/destination/net_end/department carries data.
    pub fn is_used(&self) -> bool {
        !self.usage.trim().is_empty()
            || !self.destination.trim().is_empty()
            || !self.net_end.trim().is_empty()
            || !self.department.trim().is_empty()
    }

    /// Availability predicate used by the path engine. Destination is NOT
    /// consulted here: a free core may name where its cable runs, and that
    /// destination is exactly what defines the edge.
    pub fn is_routable(&self) -> bool {
        self.usage.trim().is_empty()
            && self.net_end.trim().is_empty()
            && self.department.trim().is_empty()
    }

    /// Parsed core number, if assigned and numeric
    pub fn core_num(&self) -> Option<u32> {
        self.core_number.trim().parse().ok()
    }

    pub fn is_generated(&self) -> bool {
        self.generated || self.id.is_none()
    }
}

/// CreateRecordRequest for creating a fiber record via the API
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordRequest {
    pub station_name: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub fiber_name: String,
    #[serde(default)]
    pub core_number: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub net_start: String,
    #[serde(default)]
    pub net_end: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub connection_line: String,
}

impl CreateRecordRequest {
    pub fn into_record(self) -> FiberRecord {
        let now = Utc::now();
        FiberRecord {
            id: None,
            partition_hint: String::new(),
            station_name: self.station_name,
            destination: self.destination,
            fiber_name: self.fiber_name,
            core_number: self.core_number,
            usage: self.usage,
            department: self.department,
            contact: self.contact,
            phone: self.phone,
            notes: self.notes,
            net_start: self.net_start,
            net_end: self.net_end,
            port: self.port,
            source: self.source,
            connection_line: self.connection_line,
            path_id: None,
            generated: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// RecordUpdate carries the occupancy fields written during reservation.
/// `core_number` is only ever set for rows whose number was empty; the
/// storage layer keeps an existing number when it is None.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordUpdate {
    pub usage: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub path_id: Option<String>,
    #[serde(default)]
    pub core_number: Option<String>,
}

/// StationStats is one row of the per-station utilization dashboard
#[derive(Debug, Clone, Serialize)]
pub struct StationStats {
    pub station_name: String,
    pub total: i64,
    pub used: i64,
    pub free: i64,
}

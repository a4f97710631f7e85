mod path_history;
mod records;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::models::*;

/// Typed error for "resource not found" - enables reliable downcast
/// in the API error handler instead of fragile string matching.
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// Name-based partition routing: stations are sharded across physical
/// partitions by the first character of the normalized name. The hint is
/// assigned on create and must be echoed on every later write so it lands
/// in the right partition.
pub fn route_partition(station_name: &str) -> String {
    let normalized = crate::engine::normalize::normalize_station(station_name);
    match normalized.chars().next() {
        Some(c) if c.is_ascii_alphabetic() && c <= 'M' => "ports_a_m".to_string(),
        Some(c) if c.is_ascii_alphabetic() => "ports_n_z".to_string(),
        _ => "ports_misc".to_string(),
    }
}

/// Storage operations the path engine needs: a full snapshot read plus
/// atomic-enough write primitives. Implemented by the SQLite `Store` and by
/// an in-memory store in tests.
#[async_trait]
pub trait PlantStore: Send + Sync {
    async fn all_records(&self) -> Result<Vec<FiberRecord>>;
    async fn create_record(&self, record: &FiberRecord) -> Result<FiberRecord>;
    async fn update_record(&self, id: i64, partition: &str, update: &RecordUpdate) -> Result<()>;
    /// Reduced-field retry target: writes only the fields every partition
    /// is guaranteed to support (usage, path reference, core number)
    async fn update_record_safe(&self, id: i64, partition: &str, update: &RecordUpdate)
        -> Result<()>;
    async fn clear_occupancy(&self, id: i64, partition: &str) -> Result<()>;
    async fn delete_record(&self, id: i64, partition: &str) -> Result<()>;
    async fn save_history(&self, entry: &PathHistoryEntry) -> Result<()>;
    async fn delete_history(&self, id: &str) -> Result<()>;
}

/// Store handles all database operations, delegating to per-entity repo
/// modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::with_pool_size(db_path, 5).await
    }

    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ========== Fiber Record Operations ==========

    pub async fn list_records(&self, limit: i32, offset: i32) -> Result<Vec<FiberRecord>> {
        records::RecordRepo::list(&self.pool, limit, offset).await
    }

    pub async fn get_record(&self, id: i64) -> Result<Option<FiberRecord>> {
        records::RecordRepo::get(&self.pool, id).await
    }

    pub async fn search_records(&self, query: &str) -> Result<Vec<FiberRecord>> {
        records::RecordRepo::search(&self.pool, query).await
    }

    pub async fn replace_record(
        &self,
        id: i64,
        partition: &str,
        req: &CreateRecordRequest,
    ) -> Result<FiberRecord> {
        records::RecordRepo::replace(&self.pool, id, partition, req).await
    }

    // ========== Path History Operations ==========

    pub async fn list_path_history(&self) -> Result<Vec<PathHistoryEntry>> {
        path_history::PathHistoryRepo::list(&self.pool).await
    }

    pub async fn get_path_history(&self, id: &str) -> Result<Option<PathHistoryEntry>> {
        path_history::PathHistoryRepo::get(&self.pool, id).await
    }

    pub async fn update_path_history(
        &self,
        id: &str,
        req: &UpdatePathRequest,
    ) -> Result<PathHistoryEntry> {
        path_history::PathHistoryRepo::update_meta(&self.pool, id, req).await
    }
}

#[async_trait]
impl PlantStore for Store {
    async fn all_records(&self) -> Result<Vec<FiberRecord>> {
        records::RecordRepo::list_all(&self.pool).await
    }

    async fn create_record(&self, record: &FiberRecord) -> Result<FiberRecord> {
        records::RecordRepo::create(&self.pool, record).await
    }

    async fn update_record(&self, id: i64, partition: &str, update: &RecordUpdate) -> Result<()> {
        records::RecordRepo::update_fields(&self.pool, id, partition, update).await
    }

    async fn update_record_safe(
        &self,
        id: i64,
        partition: &str,
        update: &RecordUpdate,
    ) -> Result<()> {
        records::RecordRepo::update_safe_fields(&self.pool, id, partition, update).await
    }

    async fn clear_occupancy(&self, id: i64, partition: &str) -> Result<()> {
        records::RecordRepo::clear_occupancy(&self.pool, id, partition).await
    }

    async fn delete_record(&self, id: i64, partition: &str) -> Result<()> {
        records::RecordRepo::delete(&self.pool, id, partition).await
    }

    async fn save_history(&self, entry: &PathHistoryEntry) -> Result<()> {
        path_history::PathHistoryRepo::save(&self.pool, entry).await
    }

    async fn delete_history(&self, id: &str) -> Result<()> {
        path_history::PathHistoryRepo::delete(&self.pool, id).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::Utc;

    use super::{route_partition, PlantStore};
    use crate::models::*;

    /// In-memory PlantStore for engine tests, with switches to simulate
    /// storage-layer failures.
    #[derive(Default)]
    pub struct MemoryStore {
        records: Mutex<Vec<FiberRecord>>,
        history: Mutex<Vec<PathHistoryEntry>>,
        next_id: AtomicI64,
        reject_full_updates: AtomicBool,
        fail_history: AtomicBool,
    }

    impl MemoryStore {
        pub fn seeded(records: Vec<FiberRecord>) -> Self {
            let max_id = records.iter().filter_map(|r| r.id).max().unwrap_or(0);
            Self {
                records: Mutex::new(records),
                next_id: AtomicI64::new(max_id + 1),
                ..Default::default()
            }
        }

        pub fn set_usage(&self, id: i64, usage: &str) {
            let mut records = self.records.lock().unwrap();
            if let Some(r) = records.iter_mut().find(|r| r.id == Some(id)) {
                r.usage = usage.to_string();
            }
        }

        pub fn remove(&self, id: i64) {
            self.records.lock().unwrap().retain(|r| r.id != Some(id));
        }

        pub fn reject_full_updates(&self) {
            self.reject_full_updates.store(true, Ordering::Relaxed);
        }

        pub fn fail_history_saves(&self) {
            self.fail_history.store(true, Ordering::Relaxed);
        }

        pub fn history_entries(&self) -> Vec<PathHistoryEntry> {
            self.history.lock().unwrap().clone()
        }

        pub fn seed_history(&self, id: &str) {
            let now = Utc::now();
            self.history.lock().unwrap().push(PathHistoryEntry {
                id: id.to_string(),
                start_station: "A".to_string(),
                end_station: "B".to_string(),
                nodes: vec!["A".to_string(), "B".to_string()],
                usage: "seeded".to_string(),
                department: String::new(),
                contact: String::new(),
                notes: String::new(),
                core_count: 1,
                created_at: now,
                updated_at: now,
            });
        }
    }

    #[async_trait]
    impl PlantStore for MemoryStore {
        async fn all_records(&self) -> Result<Vec<FiberRecord>> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn create_record(&self, record: &FiberRecord) -> Result<FiberRecord> {
            let mut created = record.clone();
            created.id = Some(self.next_id.fetch_add(1, Ordering::Relaxed));
            if created.partition_hint.is_empty() {
                created.partition_hint = route_partition(&created.station_name);
            }
            self.records.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update_record(
            &self,
            id: i64,
            _partition: &str,
            update: &RecordUpdate,
        ) -> Result<()> {
            if self.reject_full_updates.load(Ordering::Relaxed) {
                return Err(anyhow!("column department is not supported"));
            }
            let mut records = self.records.lock().unwrap();
            let r = records
                .iter_mut()
                .find(|r| r.id == Some(id))
                .ok_or_else(|| anyhow!("record {} not found", id))?;
            r.usage = update.usage.clone();
            r.department = update.department.clone();
            r.contact = update.contact.clone();
            r.notes = update.notes.clone();
            r.path_id = update.path_id.clone();
            if let Some(core) = &update.core_number {
                if r.core_number.trim().is_empty() {
                    r.core_number = core.clone();
                }
            }
            Ok(())
        }

        async fn update_record_safe(
            &self,
            id: i64,
            _partition: &str,
            update: &RecordUpdate,
        ) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            let r = records
                .iter_mut()
                .find(|r| r.id == Some(id))
                .ok_or_else(|| anyhow!("record {} not found", id))?;
            r.usage = update.usage.clone();
            r.path_id = update.path_id.clone();
            if let Some(core) = &update.core_number {
                if r.core_number.trim().is_empty() {
                    r.core_number = core.clone();
                }
            }
            Ok(())
        }

        async fn clear_occupancy(&self, id: i64, _partition: &str) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            let r = records
                .iter_mut()
                .find(|r| r.id == Some(id))
                .ok_or_else(|| anyhow!("record {} not found", id))?;
            r.usage = String::new();
            r.department = String::new();
            r.contact = String::new();
            r.notes = String::new();
            r.path_id = None;
            Ok(())
        }

        async fn delete_record(&self, id: i64, _partition: &str) -> Result<()> {
            self.records.lock().unwrap().retain(|r| r.id != Some(id));
            Ok(())
        }

        async fn save_history(&self, entry: &PathHistoryEntry) -> Result<()> {
            if self.fail_history.load(Ordering::Relaxed) {
                return Err(anyhow!("history table unavailable"));
            }
            self.history.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn delete_history(&self, id: &str) -> Result<()> {
            self.history.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }
    }

    #[test]
    fn test_route_partition_is_stable() {
        assert_eq!(route_partition("Alpha"), route_partition("ALPHA (2F)"));
        assert_eq!(route_partition("Alpha"), "ports_a_m");
        assert_eq!(route_partition("Zulu"), "ports_n_z");
        assert_eq!(route_partition("#1CCB"), "ports_misc");
    }
}

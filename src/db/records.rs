use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::*;

use super::route_partition;

fn map_row(row: &SqliteRow) -> FiberRecord {
    FiberRecord {
        id: Some(row.get("id")),
        partition_hint: row.get("partition_hint"),
        station_name: row.get("station_name"),
        destination: row.get("destination"),
        fiber_name: row.get("fiber_name"),
        core_number: row.get("core_number"),
        usage: row.get("usage"),
        department: row.get("department"),
        contact: row.get("contact"),
        phone: row.get("phone"),
        notes: row.get("notes"),
        net_start: row.get("net_start"),
        net_end: row.get("net_end"),
        port: row.get("port"),
        source: row.get("source"),
        connection_line: row.get("connection_line"),
        path_id: row.try_get::<Option<String>, _>("path_id").ok().flatten(),
        generated: false,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_RECORD: &str = r#"
    SELECT id, partition_hint, station_name, destination, fiber_name,
           core_number, usage, department, contact, phone, notes,
           net_start, net_end, port, source, connection_line, path_id,
           created_at, updated_at
    FROM fiber_records
"#;

/// Fiber record database operations
pub struct RecordRepo;

impl RecordRepo {
    pub async fn list(pool: &Pool<Sqlite>, limit: i32, offset: i32) -> Result<Vec<FiberRecord>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY station_name, fiber_name, id LIMIT ? OFFSET ?",
            SELECT_RECORD
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_row).collect())
    }

    /// Full snapshot across all partitions, in insertion order
    pub async fn list_all(pool: &Pool<Sqlite>) -> Result<Vec<FiberRecord>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_RECORD))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<FiberRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_RECORD))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_row))
    }

    pub async fn search(pool: &Pool<Sqlite>, query: &str) -> Result<Vec<FiberRecord>> {
        let pattern = format!("%{}%", query);
        let rows = sqlx::query(&format!(
            "{} WHERE fiber_name LIKE ? ORDER BY fiber_name, id",
            SELECT_RECORD
        ))
        .bind(pattern)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_row).collect())
    }

    pub async fn create(pool: &Pool<Sqlite>, record: &FiberRecord) -> Result<FiberRecord> {
        let now = Utc::now();
        let partition = if record.partition_hint.is_empty() {
            route_partition(&record.station_name)
        } else {
            record.partition_hint.clone()
        };

        let result = sqlx::query(
            r#"
            INSERT INTO fiber_records (partition_hint, station_name, destination, fiber_name,
                core_number, usage, department, contact, phone, notes,
                net_start, net_end, port, source, connection_line, path_id,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&partition)
        .bind(&record.station_name)
        .bind(&record.destination)
        .bind(&record.fiber_name)
        .bind(&record.core_number)
        .bind(&record.usage)
        .bind(&record.department)
        .bind(&record.contact)
        .bind(&record.phone)
        .bind(&record.notes)
        .bind(&record.net_start)
        .bind(&record.net_end)
        .bind(&record.port)
        .bind(&record.source)
        .bind(&record.connection_line)
        .bind(&record.path_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        let new_id = result.last_insert_rowid();
        Self::get(pool, new_id)
            .await?
            .context("Record not found after creation")
    }

    /// Reservation update: occupancy fields plus the path reference.
    /// A core number is only ever filled in where it was empty, never
    /// overwritten.
    pub async fn update_fields(
        pool: &Pool<Sqlite>,
        id: i64,
        partition: &str,
        update: &RecordUpdate,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE fiber_records
            SET usage = ?, department = ?, contact = ?, notes = ?, path_id = ?,
                core_number = CASE WHEN trim(core_number) = '' THEN COALESCE(?, core_number) ELSE core_number END,
                updated_at = ?
            WHERE id = ? AND partition_hint = ?
            "#,
        )
        .bind(&update.usage)
        .bind(&update.department)
        .bind(&update.contact)
        .bind(&update.notes)
        .bind(&update.path_id)
        .bind(&update.core_number)
        .bind(Utc::now())
        .bind(id)
        .bind(partition)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Record", &id.to_string()).into());
        }
        Ok(())
    }

    /// Reduced-field variant for partitions that reject optional columns
    pub async fn update_safe_fields(
        pool: &Pool<Sqlite>,
        id: i64,
        partition: &str,
        update: &RecordUpdate,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE fiber_records
            SET usage = ?, path_id = ?,
                core_number = CASE WHEN trim(core_number) = '' THEN COALESCE(?, core_number) ELSE core_number END,
                updated_at = ?
            WHERE id = ? AND partition_hint = ?
            "#,
        )
        .bind(&update.usage)
        .bind(&update.path_id)
        .bind(&update.core_number)
        .bind(Utc::now())
        .bind(id)
        .bind(partition)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Record", &id.to_string()).into());
        }
        Ok(())
    }

    /// Clear occupancy on release, keeping the core number intact
    pub async fn clear_occupancy(pool: &Pool<Sqlite>, id: i64, partition: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE fiber_records
            SET usage = '', department = '', contact = '', notes = '', path_id = NULL, updated_at = ?
            WHERE id = ? AND partition_hint = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(partition)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Record", &id.to_string()).into());
        }
        Ok(())
    }

    /// Full replace from the edit form. The partition hint never changes
    /// once assigned.
    pub async fn replace(
        pool: &Pool<Sqlite>,
        id: i64,
        partition: &str,
        req: &CreateRecordRequest,
    ) -> Result<FiberRecord> {
        let result = sqlx::query(
            r#"
            UPDATE fiber_records
            SET station_name = ?, destination = ?, fiber_name = ?, core_number = ?,
                usage = ?, department = ?, contact = ?, phone = ?, notes = ?,
                net_start = ?, net_end = ?, port = ?, source = ?, connection_line = ?,
                updated_at = ?
            WHERE id = ? AND partition_hint = ?
            "#,
        )
        .bind(&req.station_name)
        .bind(&req.destination)
        .bind(&req.fiber_name)
        .bind(&req.core_number)
        .bind(&req.usage)
        .bind(&req.department)
        .bind(&req.contact)
        .bind(&req.phone)
        .bind(&req.notes)
        .bind(&req.net_start)
        .bind(&req.net_end)
        .bind(&req.port)
        .bind(&req.source)
        .bind(&req.connection_line)
        .bind(Utc::now())
        .bind(id)
        .bind(partition)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Record", &id.to_string()).into());
        }

        Self::get(pool, id)
            .await?
            .context("Record not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64, partition: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM fiber_records WHERE id = ? AND partition_hint = ?")
            .bind(id)
            .bind(partition)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Record", &id.to_string()).into());
        }
        Ok(())
    }
}

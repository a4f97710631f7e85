use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::*;

fn map_row(row: &SqliteRow) -> PathHistoryEntry {
    let nodes: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("nodes")).unwrap_or_default();
    PathHistoryEntry {
        id: row.get("id"),
        start_station: row.get("start_station"),
        end_station: row.get("end_station"),
        nodes,
        usage: row.get("usage"),
        department: row.get("department"),
        contact: row.get("contact"),
        notes: row.get("notes"),
        core_count: row.get("core_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_HISTORY: &str = r#"
    SELECT id, start_station, end_station, nodes, usage, department,
           contact, notes, core_count, created_at, updated_at
    FROM path_history
"#;

/// Path history database operations
pub struct PathHistoryRepo;

impl PathHistoryRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<PathHistoryEntry>> {
        let rows = sqlx::query(&format!("{} ORDER BY created_at DESC", SELECT_HISTORY))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<PathHistoryEntry>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_HISTORY))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_row))
    }

    pub async fn save(pool: &Pool<Sqlite>, entry: &PathHistoryEntry) -> Result<()> {
        let nodes = serde_json::to_string(&entry.nodes)?;
        sqlx::query(
            r#"
            INSERT INTO path_history (id, start_station, end_station, nodes,
                usage, department, contact, notes, core_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.start_station)
        .bind(&entry.end_station)
        .bind(&nodes)
        .bind(&entry.usage)
        .bind(&entry.department)
        .bind(&entry.contact)
        .bind(&entry.notes)
        .bind(entry.core_count)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Edit metadata in place. Node list and reservation state are not
    /// touched here.
    pub async fn update_meta(
        pool: &Pool<Sqlite>,
        id: &str,
        req: &UpdatePathRequest,
    ) -> Result<PathHistoryEntry> {
        let result = sqlx::query(
            r#"
            UPDATE path_history
            SET usage = ?, department = ?, contact = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.usage)
        .bind(&req.department)
        .bind(&req.contact)
        .bind(&req.notes)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Path", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("Path not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM path_history WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Path", id).into());
        }
        Ok(())
    }
}

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::model::AppData;

pub const DB_FILE_NAME: &str = "gradeboard.sqlite3";
/// Key the browser front-end used for its local-storage blob.
pub const APP_DATA_KEY: &str = "grade_tracker_v4";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let v = conn
        .query_row(
            "SELECT value_json FROM kv_store WHERE key = ?",
            [key],
            |r| r.get::<_, String>(0),
        )
        .optional()?;
    Ok(v)
}

pub fn kv_set(conn: &Connection, key: &str, value_json: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO kv_store(key, value_json, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET
           value_json = excluded.value_json,
           updated_at = excluded.updated_at",
        (key, value_json, &now),
    )?;
    Ok(())
}

pub fn kv_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM kv_store WHERE key = ?", [key])?;
    Ok(())
}

/// Parse a stored blob. Anything that is not a tree with a `students` array
/// reads as "no data".
pub fn parse_app_data(raw: &str) -> Option<AppData> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "stored app data is not valid JSON; starting empty");
            return None;
        }
    };
    if !value.get("students").map(|s| s.is_array()).unwrap_or(false) {
        tracing::warn!("stored app data has no students array; starting empty");
        return None;
    }
    match serde_json::from_value(value) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(error = %e, "stored app data does not match the grade tree; starting empty");
            None
        }
    }
}

/// Read failures of the store itself still propagate; only content problems
/// degrade to the empty tree.
pub fn load_app_data(conn: &Connection) -> anyhow::Result<AppData> {
    let Some(raw) = kv_get(conn, APP_DATA_KEY)? else {
        return Ok(AppData::default());
    };
    Ok(parse_app_data(&raw).unwrap_or_default())
}

pub fn save_app_data(conn: &Connection, data: &AppData) -> anyhow::Result<()> {
    let raw = serde_json::to_string(data).context("failed to serialize app data")?;
    kv_set(conn, APP_DATA_KEY, &raw)
}

pub fn clear_app_data(conn: &Connection) -> anyhow::Result<()> {
    kv_delete(conn, APP_DATA_KEY)
}

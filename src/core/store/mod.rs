//! Single-table persistence on SQLite.
//!
//! Every record lives in one `records` table keyed by `(tag, id)`, with an
//! optional `ref_id` correlating related rows. Bodies are JSON text; typed
//! facades ([`task_store::TaskStore`], [`message_store::MessageStore`]) do the
//! (de)serialization.

pub mod message_store;
pub mod records;
pub mod task_store;

use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::error::StoreError;

pub const TASK_TAG: &str = "TASK";
pub const MESSAGE_TAG: &str = "MESSAGE";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    tag TEXT NOT NULL,
    id TEXT NOT NULL,
    ref_id TEXT,
    body TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (tag, id)
);
CREATE INDEX IF NOT EXISTS idx_records_ref ON records(tag, ref_id);
";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("store opened at {:?}", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or replace the record at `(tag, id)`.
    pub async fn put(
        &self,
        tag: &str,
        id: &str,
        ref_id: Option<&str>,
        body: &Value,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO records (tag, id, ref_id, body) VALUES (?1, ?2, ?3, ?4)",
            params![tag, id, ref_id, body.to_string()],
        )?;
        Ok(())
    }

    pub async fn get(&self, tag: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn.lock().await;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM records WHERE tag = ?1 AND id = ?2",
                params![tag, id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(StoreError::from)
    }

    /// All records under a tag, oldest first.
    pub async fn query_all(&self, tag: &str) -> Result<Vec<Value>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT body FROM records WHERE tag = ?1 ORDER BY created_at, id")?;
        let rows = stmt.query_map(params![tag], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    /// Records under a tag sharing a correlation id, oldest first.
    pub async fn query_by_ref(&self, tag: &str, ref_id: &str) -> Result<Vec<Value>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT body FROM records WHERE tag = ?1 AND ref_id = ?2 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![tag, ref_id], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    /// Returns true when a row was actually removed.
    pub async fn delete(&self, tag: &str, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let n = conn.execute(
            "DELETE FROM records WHERE tag = ?1 AND id = ?2",
            params![tag, id],
        )?;
        Ok(n > 0)
    }
}

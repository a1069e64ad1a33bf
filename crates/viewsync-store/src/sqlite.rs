//! `SQLite`-backed implementation of [`ErrorLog`].
//!
//! Uses a single `Mutex<Connection>` for thread safety. Entries are
//! partitioned by month so operators can prune old forensic data in bulk.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use viewsync_types::StorableError;

use crate::error::{self, StoreError};
use crate::traits::ErrorLog;

/// Idempotent DDL for the error log table.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS processing_errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    partition_key TEXT NOT NULL,
    row_key TEXT NOT NULL,
    name TEXT NOT NULL,
    message TEXT NOT NULL,
    retriable INTEGER NOT NULL,
    body TEXT NOT NULL,
    failed_at TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_processing_errors_partition
    ON processing_errors (partition_key, row_key);
";

/// Durable, append-only error log backed by `SQLite`.
///
/// Create with [`SqliteErrorLog::open`] for file-backed persistence or
/// [`SqliteErrorLog::in_memory`] for tests.
pub struct SqliteErrorLog {
    conn: Mutex<Connection>,
}

impl SqliteErrorLog {
    /// Open or create the error log database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory can't be created, or
    /// [`StoreError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory error log (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the in-memory database can't be
    /// initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Month partition for a failure timestamp, e.g. `2026-03`.
    fn partition_key(failed_at: &DateTime<Utc>) -> String {
        failed_at.format("%Y-%m").to_string()
    }

    /// Row key ordering entries within a partition (epoch milliseconds).
    fn row_key(failed_at: &DateTime<Utc>) -> String {
        failed_at.timestamp_millis().to_string()
    }

    /// Read the most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on query failure.
    pub fn list(&self, limit: usize) -> error::Result<Vec<StorableError>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, message, retriable, body, failed_at
             FROM processing_errors
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (name, message, retriable, body, failed_at) = row?;
            let body = serde_json::from_str(&body)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let failed_at = DateTime::parse_from_rfc3339(&failed_at)
                .map_err(|e| StoreError::Serialization(e.to_string()))?
                .with_timezone(&Utc);
            entries.push(StorableError {
                name,
                message,
                retriable,
                body,
                failed_at,
            });
        }
        Ok(entries)
    }

    /// Count all stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on query failure.
    pub fn count(&self) -> error::Result<u64> {
        let conn = self.lock_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM processing_errors", [], |row| {
                row.get(0)
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl ErrorLog for SqliteErrorLog {
    async fn append(&self, entry: &StorableError) -> error::Result<()> {
        let body = serde_json::to_string(&entry.body)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO processing_errors
                (partition_key, row_key, name, message, retriable, body, failed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                Self::partition_key(&entry.failed_at),
                Self::row_key(&entry.failed_at),
                entry.name,
                entry.message,
                entry.retriable,
                body,
                entry.failed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use viewsync_types::Failure;

    fn entry(message: &str, retriable: bool) -> StorableError {
        let failure = if retriable {
            Failure::transient(message)
        } else {
            Failure::permanent(message)
        };
        StorableError::from_failure(json!({"id": "MSG-1", "version": 3}), &failure)
    }

    #[tokio::test]
    async fn append_then_list_roundtrips() {
        let log = SqliteErrorLog::in_memory().unwrap();
        log.append(&entry("store unavailable", true)).await.unwrap();
        log.append(&entry("malformed input", false)).await.unwrap();

        let entries = log.list(10).unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert!(entries[0].message.contains("malformed input"));
        assert!(!entries[0].retriable);
        assert!(entries[1].retriable);
        assert_eq!(entries[1].body, json!({"id": "MSG-1", "version": 3}));
    }

    #[tokio::test]
    async fn count_tracks_appends() {
        let log = SqliteErrorLog::in_memory().unwrap();
        assert_eq!(log.count().unwrap(), 0);
        for _ in 0..3 {
            log.append(&entry("lag", true)).await.unwrap();
        }
        assert_eq!(log.count().unwrap(), 3);
    }

    #[test]
    fn partition_key_is_month() {
        let failed_at: DateTime<Utc> = "2026-03-15T10:30:00Z".parse().unwrap();
        assert_eq!(SqliteErrorLog::partition_key(&failed_at), "2026-03");
    }

    #[test]
    fn list_honors_limit() {
        let log = SqliteErrorLog::in_memory().unwrap();
        let conn = log.lock_conn().unwrap();
        for i in 0..5 {
            conn.execute(
                "INSERT INTO processing_errors
                    (partition_key, row_key, name, message, retriable, body, failed_at)
                 VALUES ('2026-03', ?1, 'Storable Error', 'm', 1, '{}', '2026-03-01T00:00:00+00:00')",
                [i.to_string()],
            )
            .unwrap();
        }
        drop(conn);
        assert_eq!(log.list(2).unwrap().len(), 2);
    }
}

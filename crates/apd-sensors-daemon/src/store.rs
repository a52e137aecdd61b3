//! SQLite storage for historical readings.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use apd_sensors::{HistoryError, HistoryStore, StoredReading, TimeRange};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::{info, warn};

/// Readings kept in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamps, so text order matches time order.
fn timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn backend(e: impl std::fmt::Display) -> HistoryError {
    HistoryError::Backend(e.to_string())
}

impl SqliteStore {
    /// Open or create the database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).context("Failed to open history database")?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::create_tables(&conn)?;

        info!("History database opened at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn create_tables(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sensor_values (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sensor_name TEXT NOT NULL,
                collected_at TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sensor_values_collected_at
                ON sensor_values(collected_at);
            "#,
        )
        .context("Failed to create history tables")?;
        Ok(())
    }
}

impl HistoryStore for SqliteStore {
    fn record(&self, reading: &StoredReading) -> Result<(), HistoryError> {
        let conn = self.conn.lock().map_err(|_| HistoryError::Poisoned)?;
        conn.execute(
            "INSERT INTO sensor_values (sensor_name, collected_at, data) VALUES (?1, ?2, ?3)",
            params![
                reading.sensor_id,
                timestamp(&reading.collected_at),
                reading.data.to_string()
            ],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn query(&self, range: &TimeRange) -> Result<Vec<StoredReading>, HistoryError> {
        let conn = self.conn.lock().map_err(|_| HistoryError::Poisoned)?;
        let mut stmt = conn
            .prepare(
                "SELECT sensor_name, collected_at, data FROM sensor_values
                 WHERE collected_at >= ?1 AND collected_at <= ?2
                 ORDER BY collected_at, id",
            )
            .map_err(backend)?;

        let rows = stmt
            .query_map(
                params![timestamp(&range.start), timestamp(&range.end)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .map_err(backend)?;

        let mut readings = Vec::new();
        for row in rows {
            let (sensor_id, collected_at, data) = row.map_err(backend)?;
            let collected_at = match DateTime::parse_from_rfc3339(&collected_at) {
                Ok(instant) => instant.with_timezone(&Utc),
                Err(e) => {
                    warn!("Skipping {} row with bad timestamp {:?}: {}", sensor_id, collected_at, e);
                    continue;
                }
            };
            let data = match serde_json::from_str(&data) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Skipping {} row with bad data: {}", sensor_id, e);
                    continue;
                }
            };
            readings.push(StoredReading {
                sensor_id,
                collected_at,
                data,
            });
        }
        Ok(readings)
    }
}

//! SQLite-based authoritative storage.
//!
//! Provides persistent storage for:
//! - Settings aggregates, as JSON under their logical key
//! - Ended focus and break sessions
//! - Session statistics (daily and all-time)

use std::path::Path;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::migrations;
use crate::error::{DatabaseError, StoreError};
use crate::timer::SessionType;

/// One ended session, natural or stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_type: SessionType,
    pub completed: bool,
    pub planned_secs: u32,
    pub elapsed_secs: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_focus_sessions: u64,
    pub stopped_sessions: u64,
    pub focus_min: u64,
    pub break_min: u64,
}

/// Append-only sink for ended sessions.
pub trait SessionLog: Send {
    fn record(&mut self, record: &SessionRecord) -> Result<(), StoreError>;
}

/// SQLite database for settings and session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open (creating if needed) the database at `path` and migrate it.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Record an ended session. Returns the new row id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, record: &SessionRecord) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sessions
                (session_type, planned_secs, elapsed_secs, started_at, ended_at, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.session_type.as_str(),
                record.planned_secs,
                record.elapsed_secs,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                record.completed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Stats for sessions that ended since local midnight.
    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        let midnight = Local::now().date_naive().and_time(NaiveTime::MIN);
        let since = Local
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        self.stats_since(Some(since))
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        self.stats_since(None)
    }

    /// Aggregate sessions ending at or after `since` (all sessions when `None`).
    pub fn stats_since(&self, since: Option<DateTime<Utc>>) -> Result<Stats, rusqlite::Error> {
        let since = since
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        let mut stmt = self.conn.prepare(
            "SELECT session_type, completed, COUNT(*), COALESCE(SUM(elapsed_secs), 0)
             FROM sessions
             WHERE ended_at >= ?1
             GROUP BY session_type, completed",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        for row in rows {
            let (session_type, completed, count, secs) = row?;
            stats.total_sessions += count;
            if !completed {
                stats.stopped_sessions += count;
            }
            if session_type == SessionType::Focus.as_str() {
                if completed {
                    stats.completed_focus_sessions += count;
                }
                stats.focus_min += secs / 60;
            } else {
                stats.break_min += secs / 60;
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionLog for Database {
    fn record(&mut self, record: &SessionRecord) -> Result<(), StoreError> {
        self.record_session(record)?;
        Ok(())
    }
}

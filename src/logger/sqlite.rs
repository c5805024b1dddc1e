//! SQLite event history.

use std::path::Path;

use chrono::{Local, LocalResult, TimeZone};
use rusqlite::{Connection, params};

use crate::core::errors::Result;

use super::{EventSink, EventType, PowerEventRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS power_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    event_datetime TEXT NOT NULL,
    duration_seconds INTEGER,
    message TEXT,
    draft_confirmed BOOLEAN DEFAULT 0,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_power_events_timestamp
    ON power_events(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_power_events_event_type
    ON power_events(event_type);
";

/// Event history backed by a SQLite file.
pub struct SqliteEventLog {
    conn: Connection,
}

impl SqliteEventLog {
    /// Open (and if needed create) the history database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert one event row, returning its rowid.
    pub fn add_event(&self, record: &PowerEventRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO power_events
                (event_type, timestamp, event_datetime, duration_seconds, message, draft_confirmed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.event_type.as_str(),
                record.timestamp,
                local_datetime(record.timestamp),
                record.duration_seconds,
                record.message,
                record.draft_confirmed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<PowerEventRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_type, timestamp, duration_seconds, message, draft_confirmed
             FROM power_events ORDER BY timestamp DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (label, timestamp, duration_seconds, message, draft_confirmed) = row?;
            // Unknown labels from future versions are skipped, not fatal.
            let Some(event_type) = EventType::from_str_loose(&label) else {
                continue;
            };
            events.push(PowerEventRecord {
                event_type,
                timestamp,
                duration_seconds,
                message: message.unwrap_or_default(),
                draft_confirmed,
            });
        }
        Ok(events)
    }

    /// Delete events older than `days`, returning how many went away.
    pub fn cleanup_old_events(&self, days: i64) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM power_events
             WHERE timestamp < strftime('%s', 'now') - ?1 * 86400",
            params![days],
        )?;
        Ok(deleted)
    }

    pub(crate) const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl EventSink for SqliteEventLog {
    fn append(&self, record: &PowerEventRecord) -> Result<()> {
        self.add_event(record).map(|_| ())
    }
}

fn local_datetime(unix_secs: i64) -> String {
    match Local.timestamp_opt(unix_secs, 0) {
        LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => String::new(),
    }
}

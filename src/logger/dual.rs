//! Dual-write event log: JSONL plus SQLite with independent degradation.
//!
//! Either sink may fail without taking the other down; the append as a whole
//! fails only when every configured sink failed.

use crate::core::config::PathsConfig;
use crate::core::errors::Result;

use super::jsonl::JsonlEventLog;
use super::{EventSink, PowerEventRecord};

#[cfg(feature = "sqlite")]
use super::sqlite::SqliteEventLog;

/// The standard production sink: JSONL always, SQLite when it opens.
pub struct DualEventLog {
    jsonl: JsonlEventLog,
    #[cfg(feature = "sqlite")]
    sqlite: Option<SqliteEventLog>,
    degraded: Option<String>,
}

impl DualEventLog {
    /// Open both sinks. A SQLite open failure degrades to JSONL-only.
    #[must_use]
    pub fn open(paths: &PathsConfig) -> Self {
        let jsonl = JsonlEventLog::new(&paths.events_jsonl);
        #[cfg(feature = "sqlite")]
        let (sqlite, degraded) = match SqliteEventLog::open(&paths.events_db) {
            Ok(sqlite) => (Some(sqlite), None),
            Err(error) => (
                None,
                Some(format!("sqlite history unavailable: {error}")),
            ),
        };
        #[cfg(not(feature = "sqlite"))]
        let degraded = None;
        Self {
            jsonl,
            #[cfg(feature = "sqlite")]
            sqlite,
            degraded,
        }
    }

    /// Why the log is running degraded, if it is.
    #[must_use]
    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// The SQLite side, when it is up.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub const fn sqlite(&self) -> Option<&SqliteEventLog> {
        self.sqlite.as_ref()
    }
}

impl EventSink for DualEventLog {
    fn append(&self, record: &PowerEventRecord) -> Result<()> {
        let jsonl_result = self.jsonl.append(record);
        #[cfg(feature = "sqlite")]
        if let Some(sqlite) = &self.sqlite {
            let sqlite_result = sqlite.append(record);
            return match (jsonl_result, sqlite_result) {
                (Err(jsonl_error), Err(_)) => Err(jsonl_error),
                _ => Ok(()),
            };
        }
        jsonl_result
    }
}

#[cfg(test)]
mod tests {
    use super::DualEventLog;
    use crate::core::config::PathsConfig;
    use crate::logger::{EventSink, EventType, PowerEventRecord};

    fn paths(dir: &std::path::Path) -> PathsConfig {
        PathsConfig {
            state_file: dir.join("status.json"),
            events_db: dir.join("events.db"),
            events_jsonl: dir.join("events.jsonl"),
        }
    }

    fn row() -> PowerEventRecord {
        PowerEventRecord {
            event_type: EventType::Outage,
            timestamp: 1_700_000_000,
            duration_seconds: Some(700),
            message: "m".into(),
            draft_confirmed: true,
        }
    }

    #[test]
    fn writes_land_in_both_sinks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = DualEventLog::open(&paths(dir.path()));
        assert!(log.degraded().is_none());
        log.append(&row()).expect("append");

        assert!(dir.path().join("events.jsonl").exists());
        #[cfg(feature = "sqlite")]
        {
            let sqlite = log.sqlite().expect("sqlite up");
            assert_eq!(sqlite.recent_events(10).expect("query").len(), 1);
        }
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn unopenable_sqlite_degrades_to_jsonl_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = paths(dir.path());
        // A directory is not a valid database file.
        config.events_db = dir.path().to_path_buf();
        let log = DualEventLog::open(&config);
        assert!(log.degraded().is_some());
        log.append(&row()).expect("jsonl side still works");
        assert!(dir.path().join("events.jsonl").exists());
    }
}

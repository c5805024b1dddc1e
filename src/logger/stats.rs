//! Statistics queries over the SQLite event history.
//!
//! Aggregates are derived at query time from the event rows; nothing is
//! materialized. Downtime is attributed to the day the power came back.

use rusqlite::{OptionalExtension, params};
use serde::Serialize;

use crate::core::errors::Result;

use super::sqlite::SqliteEventLog;

/// Per-day aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayStats {
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Confirmed outages that day.
    pub outages: i64,
    /// Seconds of downtime ended that day.
    pub offline_seconds: i64,
}

/// One outage worth pointing at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutageSummary {
    /// When the recovery was observed, unix seconds.
    pub timestamp: i64,
    /// How long the outage lasted.
    pub duration_seconds: i64,
}

impl SqliteEventLog {
    /// Today's aggregate (local calendar day).
    pub fn stats_today(&self) -> Result<DayStats> {
        let (outages, offline_seconds) = self.connection().query_row(
            "SELECT
                count(CASE WHEN event_type = 'outage' THEN 1 END),
                coalesce(sum(CASE WHEN event_type = 'restored' THEN duration_seconds END), 0)
             FROM power_events
             WHERE date(timestamp, 'unixepoch', 'localtime') = date('now', 'localtime')",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        let date = self.connection().query_row(
            "SELECT date('now', 'localtime')",
            [],
            |row| row.get::<_, String>(0),
        )?;
        Ok(DayStats {
            date,
            outages,
            offline_seconds,
        })
    }

    /// Per-day aggregates over the last `days`, newest first. Days without
    /// events are absent from the result.
    pub fn stats_range(&self, days: i64) -> Result<Vec<DayStats>> {
        let mut stmt = self.connection().prepare(
            "SELECT
                date(timestamp, 'unixepoch', 'localtime') AS day,
                count(CASE WHEN event_type = 'outage' THEN 1 END),
                coalesce(sum(CASE WHEN event_type = 'restored' THEN duration_seconds END), 0)
             FROM power_events
             WHERE timestamp >= strftime('%s', 'now') - ?1 * 86400
             GROUP BY day
             ORDER BY day DESC",
        )?;
        let rows = stmt.query_map(params![days], |row| {
            Ok(DayStats {
                date: row.get(0)?,
                outages: row.get(1)?,
                offline_seconds: row.get(2)?,
            })
        })?;
        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }

    /// The longest completed outage within the last `days`, if any.
    pub fn longest_outage(&self, days: i64) -> Result<Option<OutageSummary>> {
        let summary = self
            .connection()
            .query_row(
                "SELECT timestamp, duration_seconds
                 FROM power_events
                 WHERE event_type = 'restored'
                   AND duration_seconds IS NOT NULL
                   AND timestamp >= strftime('%s', 'now') - ?1 * 86400
                 ORDER BY duration_seconds DESC
                 LIMIT 1",
                params![days],
                |row| {
                    Ok(OutageSummary {
                        timestamp: row.get(0)?,
                        duration_seconds: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }
}

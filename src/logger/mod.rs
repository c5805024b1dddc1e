//! Durable power-event history: SQLite + JSONL append-only with graceful
//! degradation.
//!
//! Only confirmed transitions land here (bootstrap, outage, restored); draft
//! lifecycle noise stays out of the durable record. Sinks never abort a
//! monitoring cycle; a failed append is reported and forgotten.

pub mod dual;
pub mod jsonl;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub mod stats;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::engine::PowerEvent;

/// Kind of a durable power event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// First ever observation; no duration attached.
    Bootstrap,
    /// Confirmed outage; duration is the uptime streak that ended.
    Outage,
    /// Confirmed recovery; duration is the downtime streak that ended.
    Restored,
}

impl EventType {
    /// Stable lowercase label used in SQLite rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Outage => "outage",
            Self::Restored => "restored",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    #[must_use]
    pub fn from_str_loose(label: &str) -> Option<Self> {
        match label {
            "bootstrap" => Some(Self::Bootstrap),
            "outage" => Some(Self::Outage),
            "restored" => Some(Self::Restored),
            _ => None,
        }
    }
}

/// One durable history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerEventRecord {
    /// What happened.
    pub event_type: EventType,
    /// When it happened, unix seconds.
    pub timestamp: i64,
    /// Length of the streak the event ended, when applicable.
    pub duration_seconds: Option<i64>,
    /// The rendered notification text, kept for later inspection.
    pub message: String,
    /// Whether the event came out of a confirmed draft.
    pub draft_confirmed: bool,
}

impl PowerEventRecord {
    /// Build a history row from a confirmed engine event and its rendered
    /// message.
    #[must_use]
    pub fn from_event(event: &PowerEvent, message: String) -> Self {
        match event {
            PowerEvent::Outage { at, uptime_secs } => Self {
                event_type: EventType::Outage,
                timestamp: *at,
                duration_seconds: Some(*uptime_secs),
                message,
                draft_confirmed: true,
            },
            PowerEvent::Restored { at, downtime_secs } => Self {
                event_type: EventType::Restored,
                timestamp: *at,
                duration_seconds: Some(*downtime_secs),
                message,
                draft_confirmed: false,
            },
        }
    }

    /// Build the bootstrap row written on the very first observation.
    #[must_use]
    pub fn bootstrap(timestamp: i64, online: bool) -> Self {
        Self {
            event_type: EventType::Bootstrap,
            timestamp,
            duration_seconds: None,
            message: format!("initial status: {}", if online { "online" } else { "offline" }),
            draft_confirmed: false,
        }
    }
}

/// Append-only destination for history rows.
pub trait EventSink {
    /// Append one row.
    fn append(&self, record: &PowerEventRecord) -> Result<()>;
}

/// Sink that drops everything; used where history is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn append(&self, _record: &PowerEventRecord) -> Result<()> {
        Ok(())
    }
}

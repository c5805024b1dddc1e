//! Append-only JSONL event history.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::core::errors::{PsnError, Result};

use super::{EventSink, PowerEventRecord};

/// One JSON object per line, appended on every confirmed event.
#[derive(Debug, Clone)]
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    /// Create a log over the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every parseable row, skipping malformed lines.
    pub fn read_all(&self) -> Result<Vec<PowerEventRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(error) => return Err(PsnError::io(&self.path, error)),
        };
        Ok(text
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl EventSink for JsonlEventLog {
    fn append(&self, record: &PowerEventRecord) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| PsnError::io(parent, e))?;
        }
        let line = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PsnError::io(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| PsnError::io(&self.path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::JsonlEventLog;
    use crate::logger::{EventSink, EventType, PowerEventRecord};

    fn row(timestamp: i64) -> PowerEventRecord {
        PowerEventRecord {
            event_type: EventType::Restored,
            timestamp,
            duration_seconds: Some(300),
            message: "back".into(),
            draft_confirmed: false,
        }
    }

    #[test]
    fn appends_accumulate_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = JsonlEventLog::new(dir.path().join("events.jsonl"));
        log.append(&row(1)).expect("append");
        log.append(&row(2)).expect("append");
        let rows = log.read_all().expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, 1);
        assert_eq!(rows[1].timestamp, 2);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = JsonlEventLog::new(dir.path().join("events.jsonl"));
        assert!(log.read_all().expect("read").is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.jsonl");
        let log = JsonlEventLog::new(&path);
        log.append(&row(1)).expect("append");
        let mut text = std::fs::read_to_string(&path).expect("read back");
        text.push_str("not json\n");
        std::fs::write(&path, text).expect("write");
        log.append(&row(2)).expect("append after damage");
        let rows = log.read_all().expect("read");
        assert_eq!(rows.len(), 2);
    }
}

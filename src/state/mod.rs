//! Persisted state slot: one JSON record, overwritten atomically, guarded by
//! an exclusive advisory lock across the read-modify-write cycle.
//!
//! Absence and corruption are both treated as "no prior state" so a damaged
//! slot degrades to the bootstrap path instead of wedging the monitor.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{PsnError, Result};
use crate::engine::{Observation, PowerState};

/// Wire form of the state slot. Field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Confirmed availability belief.
    pub online: bool,
    /// Last observation time, unix seconds.
    pub timestamp: i64,
    /// Start of the current confirmed streak, unix seconds.
    pub status_changed_at: i64,
    /// First offline observation of a pending draft, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_off_time: Option<i64>,
    /// Opaque passthrough of the last raw probe payload.
    #[serde(default)]
    pub raw_data: Value,
}

impl PersistedRecord {
    /// Build the record to persist after a decision.
    #[must_use]
    pub fn from_parts(state: &PowerState, obs: &Observation) -> Self {
        Self {
            online: state.is_online(),
            timestamp: obs.observed_at,
            status_changed_at: state.since(),
            draft_off_time: state.draft_since(),
            raw_data: obs.raw.clone(),
        }
    }

    /// Reconstruct the tagged state from the wire form.
    ///
    /// A draft on a confirmed-offline record is not representable and is
    /// ignored.
    #[must_use]
    pub fn state(&self) -> PowerState {
        match (self.online, self.draft_off_time) {
            (true, Some(draft_since)) => PowerState::DraftOffline {
                since: self.status_changed_at,
                draft_since,
            },
            (true, None) => PowerState::Online {
                since: self.status_changed_at,
            },
            (false, _) => PowerState::ConfirmedOffline {
                since: self.status_changed_at,
            },
        }
    }
}

/// Result of loading the slot.
#[derive(Debug)]
pub enum LoadedState {
    /// No slot on disk yet.
    Absent,
    /// Slot exists but could not be read or parsed; bootstrap instead.
    Corrupt {
        /// What went wrong, for the cycle report.
        details: String,
    },
    /// Slot read successfully.
    Present(PersistedRecord),
}

impl LoadedState {
    /// The record, if one was readable.
    #[must_use]
    pub fn into_record(self) -> Option<PersistedRecord> {
        match self {
            Self::Present(record) => Some(record),
            Self::Absent | Self::Corrupt { .. } => None,
        }
    }
}

/// Single-slot file-backed store.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store over the given slot path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The slot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the slot. Never fails: absence and corruption both mean
    /// "no prior state".
    #[must_use]
    pub fn load(&self) -> LoadedState {
        if !self.path.exists() {
            return LoadedState::Absent;
        }
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) => {
                return LoadedState::Corrupt {
                    details: format!("unreadable state file: {error}"),
                };
            }
        };
        match serde_json::from_str::<PersistedRecord>(&text) {
            Ok(record) => LoadedState::Present(record),
            Err(error) => LoadedState::Corrupt {
                details: format!("malformed state file: {error}"),
            },
        }
    }

    /// Overwrite the slot atomically: write a sibling temp file, then rename.
    pub fn save(&self, record: &PersistedRecord) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| PsnError::io(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json).map_err(|e| PsnError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| PsnError::io(&self.path, e))?;
        Ok(())
    }

    /// Take the exclusive advisory lock guarding load+decide+save.
    ///
    /// A second invocation blocks here until the first releases, which
    /// serializes overlapping scheduler ticks. The lock lives on a sidecar
    /// file so the slot itself can be renamed over.
    pub fn lock(&self) -> Result<StateLock> {
        let lock_path = self.path.with_extension("lock");
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| PsnError::io(&lock_path, e))?;
        StateLock::acquire(file, &lock_path)
    }
}

/// Held advisory lock; released on drop.
pub struct StateLock {
    #[cfg(unix)]
    _guard: nix::fcntl::Flock<fs::File>,
    #[cfg(not(unix))]
    _guard: fs::File,
}

impl StateLock {
    #[cfg(unix)]
    fn acquire(file: fs::File, lock_path: &Path) -> Result<Self> {
        use nix::fcntl::{Flock, FlockArg};

        match Flock::lock(file, FlockArg::LockExclusive) {
            Ok(guard) => Ok(Self { _guard: guard }),
            Err((_, errno)) => Err(PsnError::StateLock {
                path: lock_path.to_path_buf(),
                details: errno.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn acquire(file: fs::File, _lock_path: &Path) -> Result<Self> {
        // No advisory locking on this target; the scheduler's
        // at-most-one-in-flight assumption is the only guard.
        Ok(Self { _guard: file })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{LoadedState, PersistedRecord, StateStore};
    use crate::engine::{Observation, PowerState};

    fn record(online: bool, draft: Option<i64>) -> PersistedRecord {
        PersistedRecord {
            online,
            timestamp: 1_700_000_100,
            status_changed_at: 1_700_000_000,
            draft_off_time: draft,
            raw_data: json!({"name": "device"}),
        }
    }

    #[test]
    fn missing_slot_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("status.json"));
        assert!(matches!(store.load(), LoadedState::Absent));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("status.json"));
        let record = record(true, Some(1_700_000_050));
        store.save(&record).expect("save should succeed");
        match store.load() {
            LoadedState::Present(loaded) => assert_eq!(loaded, record),
            other => panic!("expected Present, got {other:?}"),
        }
    }

    #[test]
    fn malformed_slot_is_corrupt_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("status.json");
        std::fs::write(&path, b"{\"online\": tr").expect("write garbage");
        let store = StateStore::new(&path);
        match store.load() {
            LoadedState::Corrupt { details } => {
                assert!(details.contains("malformed"), "details: {details}");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn wrong_typed_fields_are_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("status.json");
        std::fs::write(&path, b"{\"online\": \"yes\", \"timestamp\": 1}").expect("write");
        let store = StateStore::new(&path);
        assert!(matches!(store.load(), LoadedState::Corrupt { .. }));
    }

    #[test]
    fn overwrite_replaces_the_single_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("status.json"));
        store.save(&record(true, None)).expect("first save");
        store.save(&record(false, None)).expect("second save");
        let loaded = store.load().into_record().expect("slot present");
        assert!(!loaded.online);
        // The temp sibling must not linger after the rename.
        assert!(!dir.path().join("status.tmp").exists());
    }

    #[test]
    fn draft_on_offline_record_is_ignored() {
        let rec = record(false, Some(1_700_000_050));
        assert_eq!(
            rec.state(),
            PowerState::ConfirmedOffline {
                since: 1_700_000_000
            }
        );
    }

    #[test]
    fn state_mapping_covers_all_variants() {
        assert_eq!(
            record(true, None).state(),
            PowerState::Online {
                since: 1_700_000_000
            }
        );
        assert_eq!(
            record(true, Some(1_700_000_050)).state(),
            PowerState::DraftOffline {
                since: 1_700_000_000,
                draft_since: 1_700_000_050
            }
        );
    }

    #[test]
    fn from_parts_carries_raw_payload_through() {
        let obs = Observation {
            online: true,
            observed_at: 42,
            raw: json!({"vendor": {"rssi": -61}}),
        };
        let state = PowerState::Online { since: 40 };
        let record = PersistedRecord::from_parts(&state, &obs);
        assert_eq!(record.timestamp, 42);
        assert_eq!(record.status_changed_at, 40);
        assert_eq!(record.raw_data["vendor"]["rssi"], json!(-61));
        assert!(record.draft_off_time.is_none());
    }

    #[test]
    fn lock_is_reacquirable_after_release() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("status.json"));
        drop(store.lock().expect("first acquire"));
        drop(store.lock().expect("second acquire"));
    }
}

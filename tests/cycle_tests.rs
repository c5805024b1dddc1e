//! Integration tests for the monitoring cycle: scripted probes, a recording
//! notifier, and tempdir-backed state and event logs.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;

use serde_json::json;

use power_sentinel::core::config::{Config, PathsConfig, TelegramConfig};
use power_sentinel::core::errors::{PsnError, Result};
use power_sentinel::engine::Observation;
use power_sentinel::logger::dual::DualEventLog;
use power_sentinel::logger::jsonl::JsonlEventLog;
use power_sentinel::logger::{EventType, NullSink};
use power_sentinel::notify::{Notifier, OutboundMessage};
use power_sentinel::probe::Probe;
use power_sentinel::runner::run_cycle;
use power_sentinel::state::{LoadedState, StateStore};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct ScriptedProbe {
    script: RefCell<VecDeque<Result<Observation>>>,
}

impl ScriptedProbe {
    fn new() -> Self {
        Self {
            script: RefCell::new(VecDeque::new()),
        }
    }

    fn push_online(&self, online: bool, observed_at: i64) {
        self.script.borrow_mut().push_back(Ok(Observation {
            online,
            observed_at,
            raw: json!({"itemData": {"online": online, "name": "Garage"}}),
        }));
    }

    fn push_failure(&self, details: &str) {
        self.script
            .borrow_mut()
            .push_back(Err(PsnError::probe(details)));
    }
}

impl Probe for ScriptedProbe {
    fn observe(&self) -> Result<Observation> {
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(PsnError::probe("script exhausted")))
    }
}

struct RecordingNotifier {
    sent: RefCell<Vec<OutboundMessage>>,
    accept: Cell<bool>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            accept: Cell::new(true),
        }
    }

    fn power_messages(&self) -> Vec<OutboundMessage> {
        self.sent
            .borrow()
            .iter()
            .filter(|m| !m.silent)
            .cloned()
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &OutboundMessage) -> bool {
        self.sent.borrow_mut().push(message.clone());
        self.accept.get()
    }
}

fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths = PathsConfig {
        state_file: dir.join("status.json"),
        events_db: dir.join("events.db"),
        events_jsonl: dir.join("events.jsonl"),
    };
    config.telegram = TelegramConfig {
        bot_token: "token".into(),
        power_chat_ids: vec!["100".into()],
        debug_chat_id: Some("900".into()),
        track_draft: true,
    };
    config
}

// ---------------------------------------------------------------------------
// Cycle behavior
// ---------------------------------------------------------------------------

#[test]
fn bootstrap_persists_state_without_power_notifications() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let probe = ScriptedProbe::new();
    probe.push_online(true, 1_000);
    let notifier = RecordingNotifier::new();
    let store = StateStore::new(&config.paths.state_file);

    let report = run_cycle(&probe, &store, &notifier, &NullSink, &config);

    assert!(report.success);
    assert_eq!(report.transition.as_deref(), Some("bootstrap"));
    assert!(notifier.power_messages().is_empty());
    let record = store.load().into_record().expect("slot written");
    assert!(record.online);
    assert_eq!(record.status_changed_at, 1_000);
    assert!(record.draft_off_time.is_none());
}

#[test]
fn brief_blip_never_reaches_power_chats() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let probe = ScriptedProbe::new();
    probe.push_online(true, 1_000);
    probe.push_online(false, 1_100); // draft opens
    probe.push_online(false, 1_400); // still inside the window
    probe.push_online(true, 1_500); // blip over
    let notifier = RecordingNotifier::new();
    let store = StateStore::new(&config.paths.state_file);

    for _ in 0..4 {
        let report = run_cycle(&probe, &store, &notifier, &NullSink, &config);
        assert!(report.success);
    }

    assert!(
        notifier.power_messages().is_empty(),
        "a sub-window blip must stay out of the power chats",
    );
    // The online streak survived the blip.
    let record = store.load().into_record().expect("slot written");
    assert!(record.online);
    assert_eq!(record.status_changed_at, 1_000);
    assert!(record.draft_off_time.is_none());
    // The debug chat saw the draft lifecycle.
    let drafts: Vec<_> = notifier
        .sent
        .borrow()
        .iter()
        .filter(|m| m.silent)
        .cloned()
        .collect();
    assert_eq!(drafts.len(), 2, "draft began + draft cancelled");
}

#[test]
fn confirmed_outage_then_recovery_reports_both_durations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let probe = ScriptedProbe::new();
    probe.push_online(true, 1_000);
    probe.push_online(false, 1_100);
    probe.push_online(false, 1_700); // window elapsed: outage, uptime 700s
    probe.push_online(true, 2_000); // restored, downtime 300s
    let notifier = RecordingNotifier::new();
    let store = StateStore::new(&config.paths.state_file);
    let events = DualEventLog::open(&config.paths);

    for _ in 0..4 {
        run_cycle(&probe, &store, &notifier, &events, &config);
    }

    let power = notifier.power_messages();
    assert_eq!(power.len(), 2);
    assert!(power[0].text.contains("11 хв"), "uptime 700s: {}", power[0].text);
    assert!(power[1].text.contains("5 хв"), "downtime 300s: {}", power[1].text);

    let record = store.load().into_record().expect("slot written");
    assert!(record.online);
    assert_eq!(record.status_changed_at, 2_000);

    // History captured bootstrap + outage + restored.
    let rows = JsonlEventLog::new(&config.paths.events_jsonl)
        .read_all()
        .expect("read history");
    let kinds: Vec<EventType> = rows.iter().map(|r| r.event_type).collect();
    assert_eq!(
        kinds,
        vec![EventType::Bootstrap, EventType::Outage, EventType::Restored]
    );
    assert_eq!(rows[1].duration_seconds, Some(700));
    assert_eq!(rows[2].duration_seconds, Some(300));
}

#[test]
fn failed_probe_leaves_the_slot_bit_for_bit_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let probe = ScriptedProbe::new();
    probe.push_online(true, 1_000);
    probe.push_failure("connect timeout");
    let notifier = RecordingNotifier::new();
    let store = StateStore::new(&config.paths.state_file);

    run_cycle(&probe, &store, &notifier, &NullSink, &config);
    let before = std::fs::read(&config.paths.state_file).expect("slot bytes");

    let report = run_cycle(&probe, &store, &notifier, &NullSink, &config);
    assert!(!report.success);
    assert!(report.observed_online.is_none());
    assert!(report.transition.is_none());

    let after = std::fs::read(&config.paths.state_file).expect("slot bytes");
    assert_eq!(before, after, "a failed probe must not mutate state");
    assert!(notifier.power_messages().is_empty());
}

#[test]
fn rejected_notifications_still_commit_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let probe = ScriptedProbe::new();
    probe.push_online(false, 1_000);
    probe.push_online(true, 1_500); // restored, but delivery will fail
    let notifier = RecordingNotifier::new();
    notifier.accept.set(false);
    let store = StateStore::new(&config.paths.state_file);

    run_cycle(&probe, &store, &notifier, &NullSink, &config);
    let report = run_cycle(&probe, &store, &notifier, &NullSink, &config);

    assert_eq!(report.notifications_failed, 1);
    assert_eq!(report.notifications_sent, 0);
    assert!(report.persisted, "persist must not depend on delivery");
    let record = store.load().into_record().expect("slot written");
    assert!(record.online);
    assert_eq!(record.status_changed_at, 1_500);
}

#[test]
fn corrupt_slot_bootstraps_instead_of_failing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    std::fs::write(&config.paths.state_file, b"{{not json").expect("write garbage");
    let probe = ScriptedProbe::new();
    probe.push_online(false, 5_000);
    let notifier = RecordingNotifier::new();
    let store = StateStore::new(&config.paths.state_file);

    let report = run_cycle(&probe, &store, &notifier, &NullSink, &config);

    assert!(report.success);
    assert_eq!(report.transition.as_deref(), Some("bootstrap"));
    assert!(notifier.power_messages().is_empty());
    let record = store.load().into_record().expect("slot rewritten");
    assert!(!record.online);
    assert_eq!(record.status_changed_at, 5_000);
}

#[test]
fn raw_vendor_payload_passes_through_to_the_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let probe = ScriptedProbe::new();
    probe.push_online(true, 1_000);
    let notifier = RecordingNotifier::new();
    let store = StateStore::new(&config.paths.state_file);

    run_cycle(&probe, &store, &notifier, &NullSink, &config);

    match store.load() {
        LoadedState::Present(record) => {
            assert_eq!(record.raw_data["itemData"]["name"], json!("Garage"));
        }
        other => panic!("expected Present, got {other:?}"),
    }
}

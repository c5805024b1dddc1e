//! One monitoring cycle: probe, decide, dispatch, persist, record.
//!
//! Ordering matters: notification dispatch happens before the state persist,
//! and the persist happens regardless of how dispatch went. State is the
//! source of truth: a crash between dispatch and persist replays the same
//! confirmed transition next run, so a duplicate notification is possible
//! but a lost one is not.

#[cfg(feature = "watch")]
pub mod watch;

use serde::Serialize;

use crate::core::config::Config;
use crate::engine::{self, NotifyIntent, TransitionKind};
use crate::logger::{EventSink, PowerEventRecord};
use crate::notify::{Dispatcher, Notifier, message};
use crate::probe::Probe;
use crate::state::{LoadedState, PersistedRecord, StateStore};

/// A single step in the cycle sequence.
#[derive(Debug, Clone, Serialize)]
pub struct CycleStep {
    /// Human-readable description.
    pub description: String,
    /// Whether this step completed successfully.
    pub done: bool,
    /// Error message if the step failed.
    pub error: Option<String>,
}

/// Structured report from one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Ordered list of steps attempted.
    pub steps: Vec<CycleStep>,
    /// Availability flag from the observation, if the probe succeeded.
    pub observed_online: Option<bool>,
    /// Transition label from the engine, if a decision was made.
    pub transition: Option<String>,
    /// Deliveries the notifier accepted.
    pub notifications_sent: usize,
    /// Deliveries the notifier rejected or failed.
    pub notifications_failed: usize,
    /// Whether the next state reached disk.
    pub persisted: bool,
    /// Whether the cycle ran to its normal conclusion.
    pub success: bool,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            observed_online: None,
            transition: None,
            notifications_sent: 0,
            notifications_failed: 0,
            persisted: false,
            success: false,
        }
    }

    fn step_ok(&mut self, description: impl Into<String>) {
        self.steps.push(CycleStep {
            description: description.into(),
            done: true,
            error: None,
        });
    }

    fn step_fail(&mut self, description: impl Into<String>, error: impl Into<String>) {
        self.steps.push(CycleStep {
            description: description.into(),
            done: false,
            error: Some(error.into()),
        });
    }
}

/// Run one cycle. Every failure mode degrades; nothing here panics or
/// propagates out of the report.
pub fn run_cycle(
    probe: &dyn Probe,
    store: &StateStore,
    notifier: &dyn Notifier,
    events: &dyn EventSink,
    config: &Config,
) -> CycleReport {
    let mut report = CycleReport::new();

    // Serialize overlapping scheduler ticks before touching the slot.
    let guard = match store.lock() {
        Ok(guard) => guard,
        Err(error) => {
            report.step_fail("acquire state lock", error.to_string());
            return report;
        }
    };
    report.step_ok("acquired state lock");

    // A failed probe is indistinguishable from "no signal": abort with the
    // slot untouched.
    let observation = match probe.observe() {
        Ok(observation) => observation,
        Err(error) => {
            report.step_fail("probe device status", error.to_string());
            drop(guard);
            return report;
        }
    };
    report.observed_online = Some(observation.online);
    report.step_ok(format!(
        "probed device: {}",
        if observation.online { "online" } else { "offline" }
    ));

    let previous = match store.load() {
        LoadedState::Present(record) => {
            report.step_ok("loaded prior state");
            Some(record.state())
        }
        LoadedState::Absent => {
            report.step_ok("no prior state; bootstrapping");
            None
        }
        LoadedState::Corrupt { details } => {
            report.step_fail("load prior state (treated as absent)", details);
            None
        }
    };

    let transition = engine::decide(
        previous.as_ref(),
        &observation,
        config.engine.confirmation_delay_secs,
    );
    report.transition = Some(transition.kind.as_str().to_string());
    report.step_ok(format!("decided: {}", transition.kind.as_str()));

    // Deliver-then-commit: all dispatch attempts precede the persist.
    let dispatcher = Dispatcher::new(
        notifier,
        &config.telegram,
        config.engine.confirmation_delay_secs,
    );
    for result in dispatcher.dispatch(&transition.intents) {
        if result.accepted {
            report.notifications_sent += 1;
            report.step_ok(format!("notified chat {} ({})", result.chat_id, result.kind));
        } else {
            report.notifications_failed += 1;
            report.step_fail(
                format!("notify chat {} ({})", result.chat_id, result.kind),
                "delivery rejected or failed",
            );
        }
    }

    let record = PersistedRecord::from_parts(&transition.next, &observation);
    match store.save(&record) {
        Ok(()) => {
            report.persisted = true;
            report.step_ok("persisted state");
        }
        Err(error) => {
            // Next cycle re-derives from the stale slot; an eventual
            // duplicate notification is the accepted cost.
            report.step_fail("persist state", error.to_string());
        }
    }
    drop(guard);

    append_history(&mut report, events, &transition.kind, &transition.intents, &observation);

    report.success = report.persisted;
    report
}

fn append_history(
    report: &mut CycleReport,
    events: &dyn EventSink,
    kind: &TransitionKind,
    intents: &[NotifyIntent],
    observation: &crate::engine::Observation,
) {
    if matches!(kind, TransitionKind::Bootstrap) {
        let record = PowerEventRecord::bootstrap(observation.observed_at, observation.online);
        match events.append(&record) {
            Ok(()) => report.step_ok("recorded bootstrap event"),
            Err(error) => report.step_fail("record bootstrap event", error.to_string()),
        }
        return;
    }
    for intent in intents {
        let NotifyIntent::Primary(event) = intent else {
            continue;
        };
        let record = PowerEventRecord::from_event(event, message::render_power_event(event));
        match events.append(&record) {
            Ok(()) => report.step_ok(format!("recorded {} event", record.event_type.as_str())),
            Err(error) => report.step_fail(
                format!("record {} event", record.event_type.as_str()),
                error.to_string(),
            ),
        }
    }
}

//! Foreground watch loop with signal-driven shutdown.
//!
//! For deployments without a cron-equivalent: runs a cycle, sleeps the
//! configured interval, repeats until SIGINT/SIGTERM. The sleep is chunked
//! so shutdown takes effect within a second.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::config::Config;
use crate::core::errors::{PsnError, Result};
use crate::logger::EventSink;
use crate::notify::Notifier;
use crate::probe::Probe;
use crate::state::StateStore;

use super::{CycleReport, run_cycle};

/// Run cycles forever, invoking `on_report` after each one.
pub fn run_watch(
    probe: &dyn Probe,
    store: &StateStore,
    notifier: &dyn Notifier,
    events: &dyn EventSink,
    config: &Config,
    mut on_report: impl FnMut(&CycleReport),
) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop)).map_err(|e| PsnError::Runtime {
            details: format!("signal handler registration failed: {e}"),
        })?;
    }

    while !stop.load(Ordering::Relaxed) {
        let report = run_cycle(probe, store, notifier, events, config);
        on_report(&report);

        let mut remaining = config.watch.interval_secs;
        while remaining > 0 && !stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_secs(1));
            remaining -= 1;
        }
    }
    Ok(())
}

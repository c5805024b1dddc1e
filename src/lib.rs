//! Power Sentinel: debounced availability monitoring for a single remote
//! power-line device.
//!
//! One scheduler tick runs one cycle: probe the vendor cloud API for the
//! device's online flag, feed the reading and the previously persisted state
//! to the debounce engine, deliver any confirmed-transition notifications to
//! Telegram, then persist the next state. Brief interruptions are absorbed
//! by a draft window; recoveries are reported immediately.
//!
//! The engine ([`engine::decide`]) is a pure function and carries the whole
//! design weight; everything else is plumbing around it: the probe, the
//! single-slot state store, the notifier, and the durable event history.

pub mod core;
pub mod engine;
pub mod logger;
pub mod notify;
pub mod probe;
pub mod runner;
pub mod state;

#[cfg(feature = "cli")]
pub mod cli_app;

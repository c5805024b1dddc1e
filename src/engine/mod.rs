//! Debounced power-state transition engine.
//!
//! Pure decision logic: one observation plus the previously confirmed state
//! in, next state plus notification intents out. No I/O happens here; the
//! cycle runner owns probing, delivery, and persistence.
//!
//! # State Machine
//!
//! ```text
//!                    obs=offline
//!  Online ─────────────────────────────► DraftOffline
//!    ▲                                      │      │
//!    │  obs=online (streak preserved)       │      │ obs=offline,
//!    └──────────────────────────────────────┘      │ elapsed >= delay
//!    ▲                                             ▼
//!    └───────────────────────────────── ConfirmedOffline
//!            obs=online (restored)
//! ```
//!
//! The asymmetry is deliberate: recovery is reported immediately, while an
//! outage must persist for the full confirmation window before it is
//! reported. The window therefore only ever delays offline reports, never
//! online reports. A draft that reaches exactly the window boundary is
//! confirmed (inclusive comparison).

use serde_json::Value;

/// Default confirmation window, in seconds.
pub const DEFAULT_CONFIRMATION_DELAY_SECS: i64 = 600;

/// One point-in-time availability reading from the device-status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Raw availability flag reported by the vendor API.
    pub online: bool,
    /// Unix seconds at which the reading was taken.
    pub observed_at: i64,
    /// Opaque vendor payload, passed through to the persisted record.
    pub raw: Value,
}

/// Confirmed belief about the device, tagged so that invalid combinations
/// (a draft while confirmed offline) cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Confirmed online since `since`.
    Online {
        /// Start of the current online streak, unix seconds.
        since: i64,
    },
    /// Believed online, but the last observation said offline; waiting for
    /// the confirmation window before reporting.
    DraftOffline {
        /// Start of the online streak the draft would end, unix seconds.
        since: i64,
        /// First offline observation of this candidate transition.
        draft_since: i64,
    },
    /// Confirmed offline since `since`.
    ConfirmedOffline {
        /// Start of the current offline streak, unix seconds.
        since: i64,
    },
}

impl PowerState {
    /// The confirmed availability belief. A draft still counts as online.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        !matches!(self, Self::ConfirmedOffline { .. })
    }

    /// Start of the current confirmed streak, unix seconds.
    #[must_use]
    pub const fn since(&self) -> i64 {
        match self {
            Self::Online { since }
            | Self::DraftOffline { since, .. }
            | Self::ConfirmedOffline { since } => *since,
        }
    }

    /// First offline observation of a pending draft, if one is active.
    #[must_use]
    pub const fn draft_since(&self) -> Option<i64> {
        match self {
            Self::DraftOffline { draft_since, .. } => Some(*draft_since),
            _ => None,
        }
    }
}

/// A confirmed transition worth telling users about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// Outage confirmed after the window elapsed.
    Outage {
        /// Confirmation time, unix seconds.
        at: i64,
        /// Length of the online streak that just ended.
        uptime_secs: i64,
    },
    /// Power came back.
    Restored {
        /// Observation time, unix seconds.
        at: i64,
        /// Length of the offline streak that just ended.
        downtime_secs: i64,
    },
}

/// Draft lifecycle step, only interesting to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftEvent {
    /// A candidate offline transition was observed.
    Began {
        /// Observation time, unix seconds.
        at: i64,
    },
    /// The device came back before the window elapsed.
    Cancelled {
        /// Observation time, unix seconds.
        at: i64,
        /// How long the draft was pending.
        draft_secs: i64,
    },
    /// The window elapsed and the outage was confirmed.
    Confirmed {
        /// Confirmation time, unix seconds.
        at: i64,
        /// How long the draft was pending.
        draft_secs: i64,
    },
}

/// One notification the cycle runner should attempt to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyIntent {
    /// Goes to every configured power chat.
    Primary(PowerEvent),
    /// Goes to the debug chat, gated by the operator verbosity flag.
    Draft(DraftEvent),
}

/// Shape of the transition that just happened, for reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// First observation ever; state created, nothing reported.
    Bootstrap,
    /// Online observation while online, or offline while confirmed offline.
    Steady,
    /// Candidate offline transition recorded.
    DraftBegan,
    /// Draft still pending, window not yet elapsed.
    DraftWaiting,
    /// Device came back before the window elapsed.
    DraftCancelled,
    /// Window elapsed; outage reported.
    OutageConfirmed,
    /// Recovery from confirmed offline; reported immediately.
    Restored,
}

impl TransitionKind {
    /// Stable lowercase label for reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Steady => "steady",
            Self::DraftBegan => "draft_began",
            Self::DraftWaiting => "draft_waiting",
            Self::DraftCancelled => "draft_cancelled",
            Self::OutageConfirmed => "outage_confirmed",
            Self::Restored => "restored",
        }
    }
}

/// Outcome of one engine decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State to persist for the next invocation.
    pub next: PowerState,
    /// Notifications to attempt, in order.
    pub intents: Vec<NotifyIntent>,
    /// What kind of step this was.
    pub kind: TransitionKind,
}

/// Decide the next state and notification intents for one observation.
///
/// `prev` is the previously persisted state, absent on the very first run.
/// `delay_secs` is the confirmation window `D`. The observation's own
/// timestamp serves as "now", which keeps the function a pure map of its
/// arguments.
#[must_use]
pub fn decide(prev: Option<&PowerState>, obs: &Observation, delay_secs: i64) -> Transition {
    let Some(prev) = prev else {
        // Bootstrap: adopt the first reading without reporting anything.
        let next = if obs.online {
            PowerState::Online {
                since: obs.observed_at,
            }
        } else {
            PowerState::ConfirmedOffline {
                since: obs.observed_at,
            }
        };
        return Transition {
            next,
            intents: Vec::new(),
            kind: TransitionKind::Bootstrap,
        };
    };

    match (*prev, obs.online) {
        (PowerState::Online { since }, true) => Transition {
            next: PowerState::Online { since },
            intents: Vec::new(),
            kind: TransitionKind::Steady,
        },

        (PowerState::Online { since }, false) => Transition {
            next: PowerState::DraftOffline {
                since,
                draft_since: obs.observed_at,
            },
            intents: vec![NotifyIntent::Draft(DraftEvent::Began {
                at: obs.observed_at,
            })],
            kind: TransitionKind::DraftBegan,
        },

        (PowerState::DraftOffline { since, draft_since }, true) => Transition {
            next: PowerState::Online { since },
            intents: vec![NotifyIntent::Draft(DraftEvent::Cancelled {
                at: obs.observed_at,
                draft_secs: obs.observed_at - draft_since,
            })],
            kind: TransitionKind::DraftCancelled,
        },

        (PowerState::DraftOffline { since, draft_since }, false) => {
            if obs.observed_at - draft_since >= delay_secs {
                Transition {
                    next: PowerState::ConfirmedOffline {
                        since: obs.observed_at,
                    },
                    intents: vec![
                        NotifyIntent::Primary(PowerEvent::Outage {
                            at: obs.observed_at,
                            uptime_secs: obs.observed_at - since,
                        }),
                        NotifyIntent::Draft(DraftEvent::Confirmed {
                            at: obs.observed_at,
                            draft_secs: obs.observed_at - draft_since,
                        }),
                    ],
                    kind: TransitionKind::OutageConfirmed,
                }
            } else {
                Transition {
                    next: PowerState::DraftOffline { since, draft_since },
                    intents: Vec::new(),
                    kind: TransitionKind::DraftWaiting,
                }
            }
        }

        (PowerState::ConfirmedOffline { since }, false) => Transition {
            next: PowerState::ConfirmedOffline { since },
            intents: Vec::new(),
            kind: TransitionKind::Steady,
        },

        (PowerState::ConfirmedOffline { since }, true) => Transition {
            next: PowerState::Online {
                since: obs.observed_at,
            },
            intents: vec![NotifyIntent::Primary(PowerEvent::Restored {
                at: obs.observed_at,
                downtime_secs: obs.observed_at - since,
            })],
            kind: TransitionKind::Restored,
        },
    }
}

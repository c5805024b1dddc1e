//! Notification delivery: the notifier boundary, the Telegram transport, and
//! sequential best-effort dispatch of engine intents.
//!
//! Delivery never blocks the cycle: a rejected or failed send is recorded
//! and the cycle moves on to persistence. Nothing here retries.

pub mod message;

use chrono::{Local, NaiveTime, Timelike};

use crate::core::config::TelegramConfig;
use crate::core::errors::{PsnError, Result};
use crate::engine::NotifyIntent;

/// One message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Rendered message body (Telegram HTML).
    pub text: String,
    /// Destination chat.
    pub chat_id: String,
    /// Deliver without a client-side notification sound.
    pub silent: bool,
    /// Bypass the quiet-hours window.
    pub force: bool,
}

/// Delivery boundary consumed by the cycle runner.
pub trait Notifier {
    /// Attempt one delivery. `true` means accepted for delivery; `false`
    /// covers rejection and transport failure alike.
    fn send(&self, message: &OutboundMessage) -> bool;
}

/// Whether `t` falls inside the nightly quiet window (23:30 .. 00:30).
///
/// Non-forced deliveries inside the window are suppressed; power events are
/// always sent forced, so only incidental traffic is affected.
#[must_use]
pub fn in_quiet_hours(t: NaiveTime) -> bool {
    let minutes = t.hour() * 60 + t.minute();
    minutes >= 23 * 60 + 30 || minutes <= 30
}

/// Telegram Bot API transport.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramNotifier {
    /// Build the transport from the Telegram section of the config.
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| PsnError::Runtime {
                details: format!("http client construction failed: {e}"),
            })?;
        Ok(Self {
            client,
            api_base: "https://api.telegram.org".to_string(),
            bot_token: config.bot_token.clone(),
        })
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, message: &OutboundMessage) -> bool {
        if !message.force && in_quiet_hours(Local::now().time()) {
            return false;
        }
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = serde_json::json!({
            "chat_id": message.chat_id,
            "text": message.text,
            "parse_mode": "HTML",
            "disable_notification": message.silent,
        });
        match self.client.post(&url).json(&body).send() {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Result of one delivery attempt, for the cycle report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchResult {
    /// Destination chat.
    pub chat_id: String,
    /// Whether the notifier accepted the message.
    pub accepted: bool,
    /// Intent class, `power` or `draft`.
    pub kind: &'static str,
}

/// Renders intents and walks them through the notifier sequentially,
/// collecting independent failures.
pub struct Dispatcher<'a> {
    notifier: &'a dyn Notifier,
    telegram: &'a TelegramConfig,
    delay_secs: i64,
}

impl<'a> Dispatcher<'a> {
    /// Build a dispatcher over the configured recipients.
    #[must_use]
    pub fn new(notifier: &'a dyn Notifier, telegram: &'a TelegramConfig, delay_secs: i64) -> Self {
        Self {
            notifier,
            telegram,
            delay_secs,
        }
    }

    /// Deliver every intent best-effort. Primary events fan out to all power
    /// chats; draft events go to the debug chat when tracking is enabled.
    /// Power events are forced past the quiet-hours window, drafts are
    /// forced but silent.
    #[must_use]
    pub fn dispatch(&self, intents: &[NotifyIntent]) -> Vec<DispatchResult> {
        let mut results = Vec::new();
        for intent in intents {
            match intent {
                NotifyIntent::Primary(event) => {
                    let text = message::render_power_event(event);
                    for chat_id in &self.telegram.power_chat_ids {
                        let accepted = self.notifier.send(&OutboundMessage {
                            text: text.clone(),
                            chat_id: chat_id.clone(),
                            silent: false,
                            force: true,
                        });
                        results.push(DispatchResult {
                            chat_id: chat_id.clone(),
                            accepted,
                            kind: "power",
                        });
                    }
                }
                NotifyIntent::Draft(event) => {
                    if !self.telegram.track_draft {
                        continue;
                    }
                    let Some(chat_id) = self.telegram.debug_chat_id.as_ref() else {
                        continue;
                    };
                    let accepted = self.notifier.send(&OutboundMessage {
                        text: message::render_draft_event(event, self.delay_secs),
                        chat_id: chat_id.clone(),
                        silent: true,
                        force: true,
                    });
                    results.push(DispatchResult {
                        chat_id: chat_id.clone(),
                        accepted,
                        kind: "draft",
                    });
                }
            }
        }
        results
    }
}

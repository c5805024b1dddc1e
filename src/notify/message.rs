//! Message templates and duration rendering for the notification channel.
//!
//! Rendering is a presentation concern: the engine hands over event data and
//! everything user-visible (wording, markers, duration strings) lives here.

use chrono::{Local, LocalResult, TimeZone};

use crate::engine::{DraftEvent, PowerEvent};

/// Render a duration as days/hours/minutes, Ukrainian style.
///
/// Higher units are omitted when zero; minutes are always shown when days
/// and hours are both zero, including the zero-minute case. The day word
/// follows the 1 / 2..4 / other pluralization rule.
#[must_use]
pub fn format_duration(total_secs: i64) -> String {
    let total_minutes = total_secs / 60;
    let total_hours = total_minutes / 60;
    let days = total_hours / 24;
    let hours = total_hours % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        let word = match days {
            1 => "день",
            2..=4 => "дні",
            _ => "днів",
        };
        parts.push(format!("{days} {word}"));
    }
    if hours > 0 {
        parts.push(format!("{hours} год."));
    }
    if minutes > 0 || (days == 0 && hours == 0) {
        parts.push(format!("{minutes} хв"));
    }
    parts.join(" ")
}

/// Local wall-clock `HH:MM` for a unix timestamp.
#[must_use]
pub fn time_of_day(unix_secs: i64) -> String {
    match Local.timestamp_opt(unix_secs, 0) {
        LocalResult::Single(dt) => dt.format("%H:%M").to_string(),
        _ => "--:--".to_string(),
    }
}

/// Render an outage/restore event for the power chats.
#[must_use]
pub fn render_power_event(event: &PowerEvent) -> String {
    match event {
        PowerEvent::Restored { at, downtime_secs } => format!(
            "💡 {} Юху! Світло повернулося!\n⏱️ Було відсутнє {}",
            time_of_day(*at),
            format_duration(*downtime_secs),
        ),
        PowerEvent::Outage { at, uptime_secs } => format!(
            "🔦 {} Йой… Халепа, знову без світла 😒\n⏱️ Було наявне {}",
            time_of_day(*at),
            format_duration(*uptime_secs),
        ),
    }
}

/// Render a draft lifecycle event for the debug chat.
///
/// `delay_secs` is the configured confirmation window, shown in the
/// draft-began message so operators know how long the wait is.
#[must_use]
pub fn render_draft_event(event: &DraftEvent, delay_secs: i64) -> String {
    match event {
        DraftEvent::Began { at } => format!(
            "⚠️ <b>DRAFT: Потенційне вимкнення світла</b>\n\n\
             🕐 Час виявлення: {}\n\
             ⏳ Очікуємо підтвердження ({})...",
            time_of_day(*at),
            format_duration(delay_secs),
        ),
        DraftEvent::Cancelled { draft_secs, .. } => format!(
            "ℹ️ <b>DRAFT СКАСОВАНО</b>\n\n💡 Світло повернулось за {} від початку draft",
            format_duration(*draft_secs),
        ),
        DraftEvent::Confirmed { draft_secs, .. } => format!(
            "✅ <b>DRAFT ПІДТВЕРДЖЕНО</b>\n\n🔦 Вимкнення світла підтверджено після {}",
            format_duration(*draft_secs),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_duration, render_draft_event, render_power_event};
    use crate::engine::{DraftEvent, PowerEvent};

    #[test]
    fn sub_minute_durations_show_zero_minutes() {
        assert_eq!(format_duration(45), "0 хв");
        assert_eq!(format_duration(0), "0 хв");
    }

    #[test]
    fn minutes_only() {
        assert_eq!(format_duration(150), "2 хв");
        assert_eq!(format_duration(2700), "45 хв");
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(format_duration(3665), "1 год. 1 хв");
    }

    #[test]
    fn exact_hours_omit_minutes() {
        assert_eq!(format_duration(7200), "2 год.");
    }

    #[test]
    fn days_hours_minutes() {
        // 1 day 1 hour 1 minute.
        assert_eq!(format_duration(90_061), "1 день 1 год. 1 хв");
    }

    #[test]
    fn day_word_pluralization() {
        assert!(format_duration(86_400).starts_with("1 день"));
        assert!(format_duration(3 * 86_400 + 3_660).starts_with("3 дні"));
        assert!(format_duration(5 * 86_400).starts_with("5 днів"));
        assert!(format_duration(21 * 86_400).starts_with("21 днів"));
    }

    #[test]
    fn restored_message_carries_downtime() {
        let text = render_power_event(&PowerEvent::Restored {
            at: 1_700_000_000,
            downtime_secs: 300,
        });
        assert!(text.starts_with("💡"));
        assert!(text.contains("5 хв"), "text: {text}");
    }

    #[test]
    fn outage_message_carries_uptime() {
        let text = render_power_event(&PowerEvent::Outage {
            at: 1_700_000_000,
            uptime_secs: 700,
        });
        assert!(text.starts_with("🔦"));
        assert!(text.contains("11 хв"), "text: {text}");
    }

    #[test]
    fn draft_began_shows_the_configured_window() {
        let text = render_draft_event(&DraftEvent::Began { at: 1_700_000_000 }, 600);
        assert!(text.contains("DRAFT"));
        assert!(text.contains("10 хв"), "text: {text}");
    }

    #[test]
    fn draft_cancelled_shows_pending_duration() {
        let text = render_draft_event(
            &DraftEvent::Cancelled {
                at: 1_700_000_000,
                draft_secs: 120,
            },
            600,
        );
        assert!(text.contains("СКАСОВАНО"));
        assert!(text.contains("2 хв"), "text: {text}");
    }
}

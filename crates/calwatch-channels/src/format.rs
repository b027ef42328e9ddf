use calwatch_core::Event;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const HEADER: &str = "📅 **New events added**";
pub const UNTITLED: &str = "(no title)";

/// Render a batch of new events as a single chat message.
///
/// Returns an empty string for an empty batch.
pub fn render_message(events: &[Event]) -> String {
    if events.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(events.len() + 2);
    lines.push(HEADER.to_string());
    lines.push(String::new());
    for event in events {
        let title = if event.title.trim().is_empty() {
            UNTITLED
        } else {
            event.title.as_str()
        };
        lines.push(format!("• **{title}** - {}", render_when(&event.start)));
    }
    lines.join("\n")
}

/// Human-readable start of an event.
///
/// `2026-02-05T14:00:00+09:00` becomes `2026/02/05 14:00` (kept in the
/// value's own offset), `2026-02-05` becomes `2026/02/05 (all day)`.
/// Values that parse as neither are returned unchanged.
pub fn render_when(raw: &str) -> String {
    if raw.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return dt.format("%Y/%m/%d %H:%M").to_string();
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return dt.format("%Y/%m/%d %H:%M").to_string();
        }
        return raw.to_string();
    }

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%Y/%m/%d (all day)").to_string(),
        Err(_) => raw.to_string(),
    }
}

use serde::{Deserialize, Serialize};

/// One calendar entry as fetched from a provider.
///
/// Identity is `id` alone: two events with the same `id` are the same event
/// regardless of the other fields. `start` and `end` keep the provider's raw
/// ISO-8601 value (a date for all-day events, a date-time otherwise) so that
/// formatting downstream is lossless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub start: String,
    pub end: String,
    /// Which calendar the event came from. Older snapshots call it `calendar_id`.
    #[serde(default, alias = "calendar_id")]
    pub source_tag: String,
}

/// Events from one fetch cycle, ordered by `start`.
pub type EventSet = Vec<Event>;

/// Stable sort by the raw `start` string.
///
/// Events that start at the same time keep their fetch order.
pub fn sort_by_start(events: &mut [Event]) {
    events.sort_by(|a, b| a.start.cmp(&b.start));
}

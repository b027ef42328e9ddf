//! Wall-clock helpers shared by the fetch window and the daily scheduler.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Longest DST gap we step across when a local time does not exist.
const MAX_GAP_MINUTES: i64 = 3 * 60;

/// Map a local wall-clock time in `tz` to a concrete instant.
///
/// - ambiguous times (clocks fall back) resolve to the earlier instant
/// - nonexistent times (clocks spring forward) resolve to the first valid
///   local minute after the gap
///
/// Returns `None` only if no valid time exists within [`MAX_GAP_MINUTES`].
pub fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=MAX_GAP_MINUTES).find_map(|m| {
            tz.from_local_datetime(&(naive + Duration::minutes(m)))
                .earliest()
        }),
    }
}

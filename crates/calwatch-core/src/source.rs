use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::event::{sort_by_start, Event, EventSet};
use crate::time::resolve_local;

/// Errors from fetching a single calendar.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials are missing, expired beyond refresh, or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (DNS, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider's response could not be decoded.
    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("invalid fetch window: {0}")]
    Window(String),
}

/// Longest lookahead a fetch window may span, roughly ten years.
pub const MAX_FETCH_DAYS: u32 = 3660;

/// Half-open-in-spirit range of local time to fetch events for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    pub time_min: DateTime<Tz>,
    pub time_max: DateTime<Tz>,
}

impl FetchWindow {
    /// From today 00:00:00 to `days` days later at 23:59:59, local to `tz`.
    ///
    /// `days` above [`MAX_FETCH_DAYS`] is rejected.
    pub fn days_from(now: DateTime<Utc>, tz: Tz, days: u32) -> Result<Self, SourceError> {
        if days > MAX_FETCH_DAYS {
            return Err(SourceError::Window(format!(
                "{days} days exceeds the {MAX_FETCH_DAYS} day limit"
            )));
        }
        let today = now.with_timezone(&tz).date_naive();
        let last_day = today
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| SourceError::Window(format!("{today} + {days} days is out of range")))?;

        let start = today.and_time(NaiveTime::MIN);
        let end = last_day.and_hms_opt(23, 59, 59).ok_or_else(|| {
            SourceError::Window(format!("cannot build end of day for {last_day}"))
        })?;

        let time_min = resolve_local(&tz, start)
            .ok_or_else(|| SourceError::Window(format!("{start} does not exist in {tz}")))?;
        let time_max = resolve_local(&tz, end)
            .ok_or_else(|| SourceError::Window(format!("{end} does not exist in {tz}")))?;

        Ok(Self { time_min, time_max })
    }
}

/// Interface implemented by every calendar provider adapter.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// List the events of one calendar inside `window`.
    ///
    /// `start`/`end` of each returned event must be the provider's raw value.
    async fn list_events(
        &self,
        calendar_id: &str,
        window: &FetchWindow,
    ) -> Result<Vec<Event>, SourceError>;
}

/// Aggregate result of fetching several calendars.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// All fetched events, sorted by `start`.
    pub events: EventSet,
    /// Calendars that failed, with the reason. Their events are absent.
    pub failed: Vec<(String, SourceError)>,
}

impl FetchOutcome {
    pub fn failed_ids(&self) -> Vec<String> {
        self.failed.iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Fetch every calendar in order, skipping the ones that fail.
///
/// A failing calendar is logged with its id and left out of the result; the
/// remaining calendars are still fetched. The merged list is sorted by `start`
/// so the final order never depends on which calendar answered first.
pub async fn fetch_events(
    source: &dyn CalendarSource,
    calendar_ids: &[String],
    window: &FetchWindow,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();

    for calendar_id in calendar_ids {
        match source.list_events(calendar_id, window).await {
            Ok(events) => {
                debug!(
                    provider = source.name(),
                    calendar_id = %calendar_id,
                    count = events.len(),
                    "calendar fetched"
                );
                outcome.events.extend(events);
            }
            Err(e) => {
                warn!(
                    provider = source.name(),
                    calendar_id = %calendar_id,
                    error = %e,
                    "calendar fetch failed, skipping"
                );
                outcome.failed.push((calendar_id.clone(), e));
            }
        }
    }

    sort_by_start(&mut outcome.events);
    info!(
        total = outcome.events.len(),
        calendars = calendar_ids.len(),
        failed = outcome.failed.len(),
        "events fetched"
    );
    outcome
}

use std::fmt;
use std::sync::Arc;

use calwatch_channels::Notifier;
use calwatch_core::{fetch_events, CalendarSource, FetchWindow, SourceError};
use calwatch_store::{EventStore, StoreError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{error, info, warn};

/// What happened to the announcement in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing new, the notifier was not called.
    Skipped,
    Delivered,
    Failed(String),
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Skipped => f.write_str("skipped"),
            Delivery::Delivered => f.write_str("delivered"),
            Delivery::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub failed_calendars: Vec<String>,
    pub new_events: usize,
    pub delivery: Delivery,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("cannot build fetch window: {0}")]
    Window(#[source] SourceError),

    #[error("failed to persist snapshot: {0}")]
    Store(#[from] StoreError),
}

/// One fetch → diff → notify → persist pass.
pub struct RunCycle {
    source: Arc<dyn CalendarSource>,
    store: EventStore,
    notifier: Arc<dyn Notifier>,
    calendar_ids: Vec<String>,
    fetch_days: u32,
    tz: Tz,
}

impl RunCycle {
    pub fn new(
        source: Arc<dyn CalendarSource>,
        store: EventStore,
        notifier: Arc<dyn Notifier>,
        calendar_ids: Vec<String>,
        fetch_days: u32,
        tz: Tz,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            calendar_ids,
            fetch_days,
            tz,
        }
    }

    /// Run a full cycle as of `now`.
    ///
    /// Calendars that fail are skipped. A delivery failure is logged and the
    /// snapshot is saved anyway, so those events are not announced again.
    /// Only a failed save is returned as an error.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        info!(
            calendars = self.calendar_ids.len(),
            fetch_days = self.fetch_days,
            "cycle started"
        );

        let window =
            FetchWindow::days_from(now, self.tz, self.fetch_days).map_err(CycleError::Window)?;
        let outcome = fetch_events(self.source.as_ref(), &self.calendar_ids, &window).await;
        if !self.calendar_ids.is_empty() && outcome.failed.len() == self.calendar_ids.len() {
            warn!("every calendar failed; the stored snapshot will be emptied");
        }

        let new = self.store.new_events(&outcome.events);

        let delivery = if new.is_empty() {
            info!("no new events");
            Delivery::Skipped
        } else {
            match self.notifier.notify(&new).await {
                Ok(()) => Delivery::Delivered,
                Err(e) => {
                    error!(
                        notifier = self.notifier.name(),
                        events = new.len(),
                        error = %e,
                        "delivery failed, these events will not be announced again"
                    );
                    Delivery::Failed(e.to_string())
                }
            }
        };

        self.store.save(&outcome.events)?;

        let report = CycleReport {
            fetched: outcome.events.len(),
            failed_calendars: outcome.failed_ids(),
            new_events: new.len(),
            delivery,
        };
        info!(
            fetched = report.fetched,
            failed_calendars = ?report.failed_calendars,
            new_events = report.new_events,
            delivery = %report.delivery,
            "cycle finished"
        );
        Ok(report)
    }
}

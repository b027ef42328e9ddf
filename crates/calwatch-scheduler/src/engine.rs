use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::schedule::DailySchedule;

/// How long an in-flight cycle may keep running after shutdown is requested.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Wait before retrying when no next run time could be computed.
const RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Runs a unit of work once per day at a fixed local time.
///
/// Invocations never overlap: the next run time is only computed after the
/// previous invocation finished. A run that fails or panics is logged and the
/// loop continues with the next day.
pub struct DailyScheduler<C = SystemClock> {
    schedule: DailySchedule,
    clock: C,
    grace: Duration,
}

impl DailyScheduler<SystemClock> {
    /// Validate `target_time` (`HH:MM`) and `timezone` and build a scheduler.
    pub fn new(target_time: &str, timezone: &str) -> Result<Self> {
        Ok(Self::with_clock(
            DailySchedule::parse(target_time, timezone)?,
            SystemClock,
        ))
    }
}

impl<C: Clock> DailyScheduler<C> {
    pub fn with_clock(schedule: DailySchedule, clock: C) -> Self {
        Self {
            schedule,
            clock,
            grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    /// Next run strictly after `now`. See [`DailySchedule::next_run_time`].
    pub fn next_run_time(&self, now: DateTime<Utc>) -> Result<DateTime<Tz>> {
        self.schedule.next_run_time(now)
    }

    /// Loop forever: sleep until the next run time, run `work`, repeat.
    ///
    /// Each invocation runs on its own task so a panic cannot take the loop
    /// down. Returns when `shutdown` becomes `true` or its sender is dropped.
    /// A shutdown during the wait returns without running `work`; a shutdown
    /// during a run waits up to the grace period, then aborts the run.
    pub async fn run_forever<F, Fut, E>(&self, mut work: F, mut shutdown: watch::Receiver<bool>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        info!(
            target_time = %self.schedule.time().format("%H:%M"),
            timezone = %self.schedule.timezone(),
            "daily scheduler started"
        );

        // Never run twice for the same target, even if the timer fires a
        // little before the wall clock reaches it.
        let mut last_target: Option<DateTime<Utc>> = None;

        loop {
            let now = self.clock.now();
            let from = match last_target {
                Some(target) if target > now => target,
                _ => now,
            };

            let (target, due) = match self.schedule.next_run_time(from) {
                Ok(next) => {
                    let target = next.with_timezone(&Utc);
                    let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
                    info!(
                        next_run = %next.to_rfc3339(),
                        wait_secs = wait.as_secs(),
                        "next run scheduled"
                    );
                    (Some(target), wait)
                }
                Err(e) => {
                    error!(error = %e, "cannot compute next run, retrying later");
                    (None, RETRY_AFTER)
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(due) => {}
                _ = shutdown_requested(&mut shutdown) => {
                    info!("daily scheduler shutting down");
                    return;
                }
            }

            let Some(target) = target else { continue };
            last_target = Some(target);

            info!(run_at = %target.to_rfc3339(), "scheduled run starting");
            let mut handle = tokio::spawn(work());

            tokio::select! {
                result = &mut handle => report(result),
                _ = shutdown_requested(&mut shutdown) => {
                    warn!(
                        grace_secs = self.grace.as_secs(),
                        "shutdown requested during a run, waiting for it to finish"
                    );
                    match tokio::time::timeout(self.grace, &mut handle).await {
                        Ok(result) => report(result),
                        Err(_) => {
                            handle.abort();
                            warn!("run aborted after grace period");
                        }
                    }
                    info!("daily scheduler shutting down");
                    return;
                }
            }
        }
    }
}

/// Resolves once `true` is observed or the sender is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

fn report<E: Display>(result: std::result::Result<std::result::Result<(), E>, JoinError>) {
    match result {
        Ok(Ok(())) => info!("scheduled run finished"),
        Ok(Err(e)) => error!(error = %e, "scheduled run failed"),
        Err(e) if e.is_panic() => error!("scheduled run panicked"),
        Err(e) => warn!(error = %e, "scheduled run cancelled"),
    }
}

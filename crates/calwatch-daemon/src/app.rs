use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use calwatch_channels::Notifier;
use calwatch_core::{CalendarSource, CalwatchConfig};
use calwatch_discord::DiscordNotifier;
use calwatch_google::GoogleCalendarSource;
use calwatch_scheduler::DailyScheduler;
use calwatch_store::EventStore;
use chrono_tz::Tz;

use crate::cycle::RunCycle;

/// Everything a command needs, built once from a validated config.
///
/// Construction does no network I/O; credentials are only used on first call.
pub struct AppState {
    pub config: CalwatchConfig,
    pub tz: Tz,
    pub source: Arc<dyn CalendarSource>,
    pub notifier: Arc<DiscordNotifier>,
    pub scheduler: DailyScheduler,
    pub cycle: Arc<RunCycle>,
}

impl AppState {
    pub fn build(config: CalwatchConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("[{}] {e}", e.code()))?;
        let tz = config.timezone()?;

        let scheduler = DailyScheduler::new(
            &config.schedule.notification_time,
            &config.schedule.timezone,
        )
        .context("invalid schedule")?
        .with_shutdown_grace(Duration::from_secs(config.schedule.shutdown_grace_secs));

        let source: Arc<dyn CalendarSource> = Arc::new(
            GoogleCalendarSource::new(
                &config.calendar.credentials_path,
                &config.calendar.token_path,
            )
            .context("cannot set up Google Calendar client")?,
        );

        let notifier = Arc::new(
            DiscordNotifier::new(&config.discord.bot_token, config.discord.channel_id)
                .context("cannot set up Discord notifier")?,
        );

        let cycle = Arc::new(RunCycle::new(
            Arc::clone(&source),
            EventStore::new(&config.storage.path),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            config.calendar.ids.clone(),
            config.calendar.fetch_days,
            tz,
        ));

        Ok(Self {
            config,
            tz,
            source,
            notifier,
            scheduler,
            cycle,
        })
    }
}

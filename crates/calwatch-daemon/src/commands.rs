use std::sync::Arc;

use anyhow::Context;
use calwatch_channels::Notifier;
use calwatch_core::{fetch_events, time::resolve_local, Event, FetchWindow};
use chrono::{Duration, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::app::AppState;

/// Daily loop until Ctrl-C or SIGTERM.
pub async fn run(app: AppState) -> anyhow::Result<()> {
    let now = Utc::now();
    info!(
        notification_time = %app.config.schedule.notification_time,
        timezone = %app.tz,
        calendars = ?app.config.calendar.ids,
        fetch_days = app.config.calendar.fetch_days,
        storage = %app.config.storage.path,
        channel_id = app.config.discord.channel_id,
        "calwatch starting"
    );
    if let Ok(next) = app.scheduler.next_run_time(now) {
        info!(next_run = %next.to_rfc3339(), "first run scheduled");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let cycle = Arc::clone(&app.cycle);
    app.scheduler
        .run_forever(
            move || {
                let cycle = Arc::clone(&cycle);
                async move { cycle.run(Utc::now()).await.map(|_| ()) }
            },
            shutdown_rx,
        )
        .await;

    info!("calwatch stopped");
    Ok(())
}

/// One cycle right now.
pub async fn once(app: &AppState) -> anyhow::Result<()> {
    let report = app.cycle.run(Utc::now()).await?;
    println!(
        "fetched {} event(s), {} new, delivery {}",
        report.fetched, report.new_events, report.delivery
    );
    if !report.failed_calendars.is_empty() {
        println!("failed calendars: {}", report.failed_calendars.join(", "));
    }
    Ok(())
}

/// Fetch and print the current event set. The snapshot is left alone.
pub async fn check_calendar(app: &AppState) -> anyhow::Result<()> {
    let window = FetchWindow::days_from(Utc::now(), app.tz, app.config.calendar.fetch_days)?;
    println!(
        "window: {} .. {}",
        window.time_min.to_rfc3339(),
        window.time_max.to_rfc3339()
    );

    let outcome = fetch_events(app.source.as_ref(), &app.config.calendar.ids, &window).await;
    for event in &outcome.events {
        println!("{:<26} {}  [{}]", event.start, event.title, event.source_tag);
    }
    println!("{} event(s)", outcome.events.len());

    if !outcome.failed.is_empty() {
        for (calendar_id, e) in &outcome.failed {
            println!("FAILED {calendar_id}: {e}");
        }
        anyhow::bail!("{} calendar(s) could not be fetched", outcome.failed.len());
    }
    Ok(())
}

/// Post a two-event sample message to the configured channel.
pub async fn test_notify(app: &AppState) -> anyhow::Result<()> {
    let tomorrow = Utc::now().with_timezone(&app.tz).date_naive() + Duration::days(1);
    let start = tomorrow
        .and_hms_opt(14, 0, 0)
        .and_then(|naive| resolve_local(&app.tz, naive))
        .context("cannot build sample start time")?;
    let end = start + Duration::hours(1);

    let sample = vec![
        Event {
            id: "calwatch-test-1".to_string(),
            title: "calwatch test event".to_string(),
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
            source_tag: "test".to_string(),
        },
        Event {
            id: "calwatch-test-2".to_string(),
            title: "calwatch all-day test event".to_string(),
            start: tomorrow.to_string(),
            end: (tomorrow + Duration::days(1)).to_string(),
            source_tag: "test".to_string(),
        },
    ];

    app.notifier
        .notify(&sample)
        .await
        .with_context(|| format!("sending to channel {}", app.config.discord.channel_id))?;
    println!("sample message sent to channel {}", app.config.discord.channel_id);
    Ok(())
}

/// Print the next scheduled run.
pub fn next_run(app: &AppState) -> anyhow::Result<()> {
    let next = app.scheduler.next_run_time(Utc::now())?;
    println!("{}", next.to_rfc3339());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

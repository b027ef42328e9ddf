use clap::{Parser, Subcommand};
use tracing::info;

use calwatch_core::CalwatchConfig;

mod app;
mod commands;
mod cycle;

/// Used when `RUST_LOG` is unset: calwatch at info, dependencies at warn.
const DEFAULT_LOG_FILTER: &str = "warn,calwatch=info";

#[derive(Parser)]
#[command(name = "calwatch")]
#[command(about = "Post newly added calendar events to a Discord channel once a day")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $CALWATCH_CONFIG, then ./calwatch.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Run the daily loop (default)
    Run,
    /// Run one cycle immediately
    Once,
    /// Fetch and print upcoming events without touching the snapshot
    CheckCalendar,
    /// Send a sample message to the configured channel
    TestNotify,
    /// Print the next scheduled run time
    NextRun,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > CALWATCH_CONFIG env > ./calwatch.toml
    let config_path = cli.config.or_else(|| std::env::var("CALWATCH_CONFIG").ok());
    let config = CalwatchConfig::load(config_path.as_deref())?;
    let app = app::AppState::build(config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "configuration loaded");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => commands::run(app).await,
        Command::Once => commands::once(&app).await,
        Command::CheckCalendar => commands::check_calendar(&app).await,
        Command::TestNotify => commands::test_notify(&app).await,
        Command::NextRun => commands::next_run(&app),
    }
}

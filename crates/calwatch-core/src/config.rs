use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CalwatchError, Result};
use crate::source::MAX_FETCH_DAYS;

pub const DEFAULT_CONFIG_PATH: &str = "calwatch.toml";
pub const DEFAULT_NOTIFICATION_TIME: &str = "07:00";
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
pub const DEFAULT_FETCH_DAYS: u32 = 30;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Plain environment variable names accepted for deployments that predate the
/// `CALWATCH_` prefix, mapped onto their config paths.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DISCORD_BOT_TOKEN", "discord.bot_token"),
    ("DISCORD_CHANNEL_ID", "discord.channel_id"),
    ("GOOGLE_CREDENTIALS_PATH", "calendar.credentials_path"),
    ("GOOGLE_TOKEN_PATH", "calendar.token_path"),
    ("CALENDAR_IDS", "calendar.ids"),
    ("EVENT_FETCH_DAYS", "calendar.fetch_days"),
    ("NOTIFICATION_TIME", "schedule.notification_time"),
    ("TIMEZONE", "schedule.timezone"),
    ("STORAGE_PATH", "storage.path"),
];

/// Top-level config (calwatch.toml + env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalwatchConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily run, `HH:MM`.
    #[serde(default = "default_notification_time")]
    pub notification_time: String,
    /// IANA zone name the notification time is expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// How long an in-flight cycle may keep running after a shutdown request.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            notification_time: default_notification_time(),
            timezone: default_timezone(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Calendars to poll, in order. Accepts a list or a comma-separated string.
    #[serde(default = "default_calendar_ids", deserialize_with = "list_or_csv")]
    pub ids: Vec<String>,
    /// Lookahead window in days, counted from today.
    #[serde(default = "default_fetch_days")]
    pub fetch_days: u32,
    /// OAuth client secrets downloaded from the Google Cloud console.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Authorized-user token file (access + refresh token).
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            ids: default_calendar_ids(),
            fetch_days: default_fetch_days(),
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot of the events seen by the previous cycle.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Target text channel. Zero means "not configured".
    #[serde(default)]
    pub channel_id: u64,
}

fn default_notification_time() -> String {
    DEFAULT_NOTIFICATION_TIME.to_string()
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_shutdown_grace_secs() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}
fn default_calendar_ids() -> Vec<String> {
    vec!["primary".to_string()]
}
fn default_fetch_days() -> u32 {
    DEFAULT_FETCH_DAYS
}
fn default_credentials_path() -> String {
    "credentials/credentials.json".to_string()
}
fn default_token_path() -> String {
    "credentials/token.json".to_string()
}
fn default_storage_path() -> String {
    "data/previous_events.json".to_string()
}

fn list_or_csv<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    let items = match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(raw) => raw.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}

impl CalwatchConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Sources, lowest precedence first:
    ///   1. `config_path`, or `calwatch.toml` in the working directory (optional)
    ///   2. legacy plain env names (`DISCORD_BOT_TOKEN`, `CALENDAR_IDS`, ...)
    ///   3. `CALWATCH_*` env vars, `__` separating sections
    ///      (`CALWATCH_DISCORD__CHANNEL_ID`)
    ///
    /// The result is not validated; call [`CalwatchConfig::validate`] before use.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let legacy_keys: Vec<&str> = LEGACY_ENV.iter().map(|(env, _)| *env).collect();
        let legacy = Env::raw().only(&legacy_keys).map(|key| {
            LEGACY_ENV
                .iter()
                .find(|(env, _)| key.as_str().eq_ignore_ascii_case(env))
                .map(|(_, path)| (*path).into())
                .unwrap_or_else(|| key.into())
        });

        Figment::new()
            .merge(Toml::file(path))
            .merge(legacy)
            .merge(Env::prefixed("CALWATCH_").split("__"))
            .extract()
            .map_err(|e| CalwatchError::Config(e.to_string()))
    }

    /// Fail fast on settings the daily loop cannot run without.
    ///
    /// The notification time itself is checked when the scheduler is built.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(CalwatchError::MissingSetting {
                key: "discord.bot_token".to_string(),
            });
        }
        if self.discord.channel_id == 0 {
            return Err(CalwatchError::MissingSetting {
                key: "discord.channel_id".to_string(),
            });
        }
        if self.calendar.ids.is_empty() {
            return Err(CalwatchError::Config(
                "calendar.ids must name at least one calendar".to_string(),
            ));
        }
        if !(1..=MAX_FETCH_DAYS).contains(&self.calendar.fetch_days) {
            return Err(CalwatchError::Config(format!(
                "calendar.fetch_days must be between 1 and {MAX_FETCH_DAYS}, got {}",
                self.calendar.fetch_days
            )));
        }
        self.timezone()?;
        Ok(())
    }

    /// Parse the configured IANA timezone.
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.schedule
            .timezone
            .parse()
            .map_err(|_| CalwatchError::UnknownTimezone {
                name: self.schedule.timezone.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CalwatchConfig {
        let mut config = CalwatchConfig::default();
        config.discord.bot_token = "token".to_string();
        config.discord.channel_id = 1234;
        config
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = CalwatchConfig::default();
        assert_eq!(config.schedule.notification_time, "07:00");
        assert_eq!(config.schedule.timezone, "Asia/Tokyo");
        assert_eq!(config.calendar.ids, vec!["primary"]);
        assert_eq!(config.calendar.fetch_days, 30);
        assert_eq!(config.storage.path, "data/previous_events.json");
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn missing_token_is_rejected() {
        let mut config = valid();
        config.discord.bot_token = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "MISSING_SETTING");
        assert!(err.to_string().contains("discord.bot_token"));
    }

    #[test]
    fn zero_channel_is_rejected() {
        let mut config = valid();
        config.discord.channel_id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut config = valid();
        config.schedule.timezone = "Mars/Olympus_Mons".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_TIMEZONE");
    }

    #[test]
    fn empty_calendar_list_is_rejected() {
        let mut config = valid();
        config.calendar.ids.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn fetch_days_out_of_range_is_rejected() {
        for days in [0, MAX_FETCH_DAYS + 1, u32::MAX] {
            let mut config = valid();
            config.calendar.fetch_days = days;
            let err = config.validate().unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR", "fetch_days = {days}");
            assert!(err.to_string().contains("calendar.fetch_days"));
        }

        let mut config = valid();
        config.calendar.fetch_days = MAX_FETCH_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn calendar_ids_accept_comma_separated_string() {
        let cal: CalendarConfig =
            serde_json::from_str(r#"{"ids": "primary, team@group.calendar.google.com,,"}"#)
                .unwrap();
        assert_eq!(cal.ids, vec!["primary", "team@group.calendar.google.com"]);
    }

    #[test]
    fn calendar_ids_accept_list() {
        let cal: CalendarConfig = serde_json::from_str(r#"{"ids": ["a", " b "]}"#).unwrap();
        assert_eq!(cal.ids, vec!["a", "b"]);
    }

    #[test]
    fn load_reads_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
[schedule]
notification_time = "06:30"

[calendar]
ids = ["work", "home"]
fetch_days = 14

[storage]
path = "/tmp/calwatch-test/snapshot.json"
"#,
            )?;

            let config = CalwatchConfig::load(Some("custom.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.schedule.notification_time, "06:30");
            assert_eq!(config.calendar.fetch_days, 14);
            assert_eq!(config.calendar.ids, vec!["work", "home"]);
            assert_eq!(config.storage.path, "/tmp/calwatch-test/snapshot.json");
            // untouched sections keep their defaults
            assert_eq!(config.calendar.token_path, "credentials/token.json");
            Ok(())
        });
    }

    const TOML: &str = r#"
[schedule]
notification_time = "06:30"

[calendar]
ids = ["from-file"]
fetch_days = 14
"#;

    #[test]
    fn prefixed_env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_PATH, TOML)?;
            jail.set_env("CALWATCH_SCHEDULE__NOTIFICATION_TIME", "06:15");
            jail.set_env("CALWATCH_DISCORD__CHANNEL_ID", "42");

            let config = CalwatchConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.schedule.notification_time, "06:15");
            assert_eq!(config.discord.channel_id, 42);
            assert_eq!(config.calendar.fetch_days, 14);
            assert_eq!(config.calendar.ids, vec!["from-file"]);
            Ok(())
        });
    }

    #[test]
    fn legacy_env_names_map_onto_sections() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_PATH, TOML)?;
            jail.set_env("DISCORD_BOT_TOKEN", "legacy-token");
            jail.set_env("DISCORD_CHANNEL_ID", "123456789012345678");
            jail.set_env("CALENDAR_IDS", "work, team@group.calendar.google.com");
            jail.set_env("EVENT_FETCH_DAYS", "7");
            jail.set_env("STORAGE_PATH", "state/seen.json");

            let config = CalwatchConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.discord.bot_token, "legacy-token");
            assert_eq!(config.discord.channel_id, 123_456_789_012_345_678);
            assert_eq!(
                config.calendar.ids,
                vec!["work", "team@group.calendar.google.com"]
            );
            assert_eq!(config.calendar.fetch_days, 7);
            assert_eq!(config.storage.path, "state/seen.json");
            // not overridden
            assert_eq!(config.schedule.notification_time, "06:30");
            Ok(())
        });
    }

    #[test]
    fn prefixed_env_beats_legacy_names() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DISCORD_BOT_TOKEN", "legacy-token");
            jail.set_env("CALWATCH_DISCORD__BOT_TOKEN", "prefixed-token");
            jail.set_env("NOTIFICATION_TIME", "08:00");
            jail.set_env("CALWATCH_SCHEDULE__NOTIFICATION_TIME", "09:45");

            let config = CalwatchConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.discord.bot_token, "prefixed-token");
            assert_eq!(config.schedule.notification_time, "09:45");
            Ok(())
        });
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown timezone: {name}")]
    UnknownTimezone { name: String },

    #[error("Missing required setting: {key}")]
    MissingSetting { key: String },
}

impl CalwatchError {
    /// Short error code string used in startup diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            CalwatchError::Config(_) => "CONFIG_ERROR",
            CalwatchError::UnknownTimezone { .. } => "UNKNOWN_TIMEZONE",
            CalwatchError::MissingSetting { .. } => "MISSING_SETTING",
        }
    }
}

pub type Result<T> = std::result::Result<T, CalwatchError>;

use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The target time is not `HH:MM` with hour 0–23 and minute 0–59.
    #[error("Invalid target time {value:?}: expected HH:MM")]
    InvalidTime { value: String },

    /// The timezone is not a known IANA zone name.
    #[error("Unknown timezone: {name}")]
    UnknownTimezone { name: String },

    /// The target time does not map to any instant on the given day.
    #[error("Cannot resolve {time} on {date} in {tz}")]
    Unresolvable {
        date: String,
        time: String,
        tz: String,
    },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

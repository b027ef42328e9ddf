use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;

use calwatch_core::time::resolve_local;

use crate::error::{Result, ScheduleError};

/// Days to look ahead when a target time cannot be resolved on a given day.
const MAX_DAYS_AHEAD: i64 = 3;

/// "Every day at HH:MM" in a specific timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    /// Parse `target_time` (`HH:MM`) and an IANA `timezone` name.
    pub fn parse(target_time: &str, timezone: &str) -> Result<Self> {
        let time = parse_hhmm(target_time)?;
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ScheduleError::UnknownTimezone {
                name: timezone.to_string(),
            })?;
        Ok(Self { time, tz })
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The first occurrence of the target time strictly after `now`.
    ///
    /// Takes today's occurrence in the schedule's timezone, or the next
    /// calendar day's if `now` is at or past it. Days are stepped on the local
    /// calendar, so across a DST change the gap is 23 or 25 hours rather than
    /// a fixed 24. Missed days are never replayed.
    pub fn next_run_time(&self, now: DateTime<Utc>) -> Result<DateTime<Tz>> {
        let today = now.with_timezone(&self.tz).date_naive();

        for offset in 0..=MAX_DAYS_AHEAD {
            let date = today + Duration::days(offset);
            let Some(candidate) = resolve_local(&self.tz, date.and_time(self.time)) else {
                continue;
            };
            if candidate.with_timezone(&Utc) > now {
                return Ok(candidate);
            }
        }

        Err(ScheduleError::Unresolvable {
            date: today.to_string(),
            time: self.time.format("%H:%M").to_string(),
            tz: self.tz.to_string(),
        })
    }
}

/// Strict `HH:MM`: one or two digit hour 0–23, two digit minute 0–59.
fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    let invalid = || ScheduleError::InvalidTime {
        value: value.to_string(),
    };

    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(hour) || hour.len() > 2 || !all_digits(minute) || minute.len() != 2 {
        return Err(invalid());
    }

    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .filter(|_| hour <= 23 && minute <= 59)
        .ok_or_else(invalid)
}

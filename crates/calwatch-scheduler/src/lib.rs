//! `calwatch-scheduler`: run a job once a day at a fixed local time.
//!
//! # Overview
//!
//! [`DailySchedule`] turns an `HH:MM` target and an IANA timezone into the
//! next concrete instant. [`DailyScheduler`] sleeps until that instant, runs
//! the job on its own task, and repeats until a shutdown signal arrives.
//!
//! # DST handling
//!
//! | Local target time | Resolves to                                   |
//! |-------------------|-----------------------------------------------|
//! | Exists once       | That instant                                  |
//! | Repeated (fall)   | The earlier of the two instants               |
//! | Skipped (spring)  | The first valid minute after the gap          |

pub mod engine;
pub mod error;
pub mod schedule;

pub use engine::{Clock, DailyScheduler, SystemClock, DEFAULT_SHUTDOWN_GRACE};
pub use error::{Result, ScheduleError};
pub use schedule::DailySchedule;

//! `calwatch-core`: shared types for the calwatch daemon. Holds configuration,
//! the [`Event`] model, and the calendar source interface.

pub mod config;
pub mod error;
pub mod event;
pub mod source;
pub mod time;

pub use config::CalwatchConfig;
pub use error::{CalwatchError, Result};
pub use event::{Event, EventSet};
pub use source::{
    fetch_events, CalendarSource, FetchOutcome, FetchWindow, SourceError, MAX_FETCH_DAYS,
};

//! `calwatch-google`: Google Calendar v3 implementation of
//! [`calwatch_core::CalendarSource`].

pub mod client;
pub mod oauth;

pub use client::{GoogleCalendarSource, DEFAULT_API_BASE, REQUEST_TIMEOUT};
pub use oauth::{AuthorizedUser, ClientSecrets, GoogleAuth};

//! `calwatch-channels`: the notification side of calwatch.
//!
//! [`Notifier`] is the seam between the run cycle and a chat service;
//! [`format`] renders a batch of new events into the message text shared by
//! every adapter.

pub mod channel;
pub mod error;
pub mod format;

pub use channel::Notifier;
pub use error::ChannelError;
pub use format::render_message;

//! `calwatch-discord`: Discord delivery for calwatch notifications.

pub mod error;
pub mod notifier;
pub mod send;

pub use notifier::DiscordNotifier;

use async_trait::async_trait;
use calwatch_core::Event;

use crate::error::ChannelError;

/// Common interface implemented by every notification adapter.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// by the scheduler and the one-shot CLI commands.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable lowercase identifier for this adapter (e.g. `"discord"`).
    fn name(&self) -> &str;

    /// Announce `events` as one batch message.
    ///
    /// Must return `Ok(())` without contacting the remote service when
    /// `events` is empty. Delivery is best effort: callers log the error
    /// and carry on.
    async fn notify(&self, events: &[Event]) -> Result<(), ChannelError>;
}

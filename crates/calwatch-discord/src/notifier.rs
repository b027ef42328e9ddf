use std::sync::Arc;

use async_trait::async_trait;
use calwatch_channels::{render_message, ChannelError, Notifier};
use calwatch_core::Event;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use tracing::{debug, info, warn};

use crate::error::classify;
use crate::send::send_chunked;

/// Posts new-event batches to one Discord text channel over the REST API.
///
/// No gateway connection is opened; a bot token with "Send Messages" on the
/// target channel is all that is needed.
pub struct DiscordNotifier {
    http: Arc<Http>,
    channel_id: u64,
}

impl DiscordNotifier {
    pub fn new(bot_token: &str, channel_id: u64) -> Result<Self, ChannelError> {
        let token = bot_token.trim();
        if token.is_empty() {
            return Err(ChannelError::ConfigError("no bot token configured".into()));
        }
        if channel_id == 0 {
            return Err(ChannelError::ConfigError("channel id must be non-zero".into()));
        }
        Ok(Self {
            http: Arc::new(Http::new(token)),
            channel_id,
        })
    }

    /// Post `text` as-is, split into chunks when needed.
    pub async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        let channel = ChannelId::new(self.channel_id);
        match send_chunked(&self.http, channel, text).await {
            Ok(chunks) => {
                debug!(channel_id = self.channel_id, chunks, "discord: message posted");
                Ok(())
            }
            Err(e) => {
                let err = classify(&e, self.channel_id);
                warn!(channel_id = self.channel_id, error = %err, "discord: delivery FAILED");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, events: &[Event]) -> Result<(), ChannelError> {
        if events.is_empty() {
            debug!("discord: nothing to announce");
            return Ok(());
        }

        self.send_text(&render_message(events)).await?;
        info!(
            channel_id = self.channel_id,
            events = events.len(),
            "discord: new events announced"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_settings() {
        assert!(matches!(
            DiscordNotifier::new("   ", 42),
            Err(ChannelError::ConfigError(_))
        ));
        assert!(matches!(
            DiscordNotifier::new("token", 0),
            Err(ChannelError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        // the token is never used: nothing is sent for an empty batch
        let notifier = DiscordNotifier::new("not-a-real-token", 42).unwrap();
        notifier.notify(&[]).await.unwrap();
    }
}

use thiserror::Error;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The remote service could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The channel rejected the supplied credentials or token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The credentials are valid but may not post to the target.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The target channel does not exist or is not visible.
    #[error("Channel not found: {0}")]
    NotFound(String),

    /// The channel-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

use calwatch_channels::ChannelError;

/// Map a serenity failure onto the adapter-neutral [`ChannelError`].
pub fn classify(err: &serenity::Error, channel_id: u64) -> ChannelError {
    match err {
        serenity::Error::Http(http) => match http.status_code() {
            Some(status) => from_status(status.as_u16(), channel_id, &err.to_string()),
            None => ChannelError::ConnectionFailed(err.to_string()),
        },
        _ => ChannelError::SendFailed(err.to_string()),
    }
}

/// Map an HTTP status returned by the Discord API.
pub fn from_status(status: u16, channel_id: u64, detail: &str) -> ChannelError {
    match status {
        401 => ChannelError::AuthFailed(format!("bot token rejected: {detail}")),
        403 => ChannelError::PermissionDenied(format!(
            "bot may not post to channel {channel_id}: {detail}"
        )),
        404 => ChannelError::NotFound(format!("channel {channel_id}: {detail}")),
        _ => ChannelError::SendFailed(format!("HTTP {status}: {detail}")),
    }
}

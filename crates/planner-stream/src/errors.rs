/// Errors raised by a channel transport while opening or reading the push channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Connection or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The stream endpoint answered with a non-success HTTP status.
    #[error("stream endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },
    /// The channel could not be used as an event stream (bad content, bad URL).
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl ChannelError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message }
            | Self::Status { message, .. }
            | Self::Protocol { message } => message,
        }
    }
}

/// Top-level error type for the stream client API.
///
/// Failures that happen after a run is streaming are not returned as errors: they
/// become a terminal phase of the run state (`Errored` or `Interrupted`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Invalid client or transport configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid run parameters.
    #[error("validation error: {0}")]
    Validation(String),
    /// `start` was called while the handle is still streaming.
    #[error("run {run_id} is still streaming on this handle")]
    RunActive { run_id: uuid::Uuid },
    /// The channel could not be opened.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_error_exposes_message() {
        assert_eq!(ChannelError::status(503, "busy").message(), "busy");
        assert_eq!(
            StreamError::from(ChannelError::transport("reset")).to_string(),
            "transport error: reset"
        );
    }
}

use slackhook_transport::TransportError;
use thiserror::Error;

/// Errors raised while delivering a payload to the webhook.
///
/// These never reach the caller of `log`; they are reported through a
/// `Failed` transport event.
#[derive(Debug, Error)]
pub enum SlackError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Errors raised while resolving a [`SlackConfig`](crate::SlackConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("invalid boolean for {key}: {value}")]
    InvalidBool { key: String, value: String },

    #[error("invalid number for {key}: {value}")]
    InvalidNumber { key: String, value: String },

    #[error("invalid payload mode: {0} (expected `blocks` or `text`)")]
    InvalidPayloadMode(String),

    #[error("failed to parse configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<SlackError> for TransportError {
    fn from(err: SlackError) -> Self {
        TransportError::Delivery(err.to_string())
    }
}

impl From<ConfigError> for TransportError {
    fn from(err: ConfigError) -> Self {
        TransportError::Configuration(err.to_string())
    }
}

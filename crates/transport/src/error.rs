use slackhook_core::UnknownLevel;
use thiserror::Error;

/// Errors surfaced by transport management operations.
///
/// `Transport::log` never returns these; they come from level changes, driver
/// lookup and construction.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The level name is not one of the syslog level names.
    #[error("unknown log level: {0}")]
    UnknownLevel(String),

    /// No factory is registered under the requested driver name.
    #[error("transport driver not found: {0}")]
    UnknownDriver(String),

    /// The transport was given invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A record could not be delivered to its destination.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl From<UnknownLevel> for TransportError {
    fn from(err: UnknownLevel) -> Self {
        Self::UnknownLevel(err.0)
    }
}

use slackhook_core::{Level, LogRecord};
use tokio::sync::broadcast;

use crate::error::TransportError;

/// Lifecycle notification emitted after a delivery attempt settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The destination accepted the record.
    Logged { transport: String, level: Level },
    /// Delivery failed. The record is not retried.
    Failed {
        transport: String,
        level: Level,
        error: String,
    },
}

/// Why a record was dropped without being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The level name did not resolve to a syslog level.
    UnknownLevel(String),
    /// No async runtime was available to run the request on.
    NoRuntime,
    /// The in-flight request limit was reached.
    Saturated,
}

/// Immediate result of handing a record to [`Transport::log`].
///
/// Returning this value is the completion signal: it happens exactly once per
/// call and never waits for network I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDispatch {
    /// A request was dispatched in the background.
    Sent,
    /// The record was handled locally and deliberately kept off the wire.
    Suppressed,
    /// The record is less severe than the transport's threshold.
    Filtered,
    /// The transport has no usable destination.
    Disabled,
    Dropped(DropReason),
}

impl LogDispatch {
    /// Return `true` if a request was dispatched.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// A destination that log records are forwarded to.
///
/// Implementations must never block the caller or panic from `log`;
/// failures are reported through [`TransportEvent`]s instead.
pub trait Transport: Send + Sync {
    /// Logical name of this transport instance.
    fn name(&self) -> &str;

    /// Current minimum severity.
    fn level(&self) -> Level;

    /// Change the minimum severity by name without rebuilding the transport.
    fn set_level(&self, level: &str) -> Result<(), TransportError>;

    /// Forward a record logged at `level`.
    fn log(&self, level: &str, record: LogRecord) -> LogDispatch;

    /// Receive lifecycle events for records sent after subscribing.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}

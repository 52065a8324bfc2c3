//! Core types shared by slackhook transports: syslog levels, log records and
//! the Slack message payload.

pub mod extra;
pub mod level;
pub mod payload;
pub mod record;

pub use extra::{ExtraFields, ExtraValue, SharedObject};
pub use level::{Level, UnknownLevel};
pub use payload::{Block, SlackPayload, TextObject, WebhookBody};
pub use record::{ErrorInfo, HttpRequestInfo, LogMessage, LogRecord, RequestContext};

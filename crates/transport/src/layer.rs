//! Bridge from `tracing` events to a [`Transport`].
//!
//! [`TransportLayer`] is a [`tracing_subscriber::Layer`]: every event that
//! reaches it becomes a [`LogRecord`]. The `message` field is the record text,
//! fields recorded as errors become the error message, and all remaining
//! fields are carried as extra fields.

use std::fmt;
use std::sync::Arc;

use slackhook_core::{ErrorInfo, ExtraFields, Level, LogMessage, LogRecord};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::transport::Transport;

/// Target roots whose events never reach the transport. These are the HTTP
/// stack a transport sends with; forwarding their events would feed back into
/// the transport.
const IGNORED_TARGET_ROOTS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "rustls"];

/// Map a `tracing` level onto the syslog table.
pub fn syslog_level(level: &tracing::Level) -> Level {
    if *level == tracing::Level::ERROR {
        Level::Error
    } else if *level == tracing::Level::WARN {
        Level::Warning
    } else if *level == tracing::Level::INFO {
        Level::Info
    } else {
        Level::Debug
    }
}

fn is_ignored_target(target: &str) -> bool {
    let root = target.split("::").next().unwrap_or(target);
    root.starts_with("slackhook") || IGNORED_TARGET_ROOTS.contains(&root)
}

/// `tracing` layer forwarding events to a transport.
pub struct TransportLayer<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: Transport + ?Sized> TransportLayer<T> {
    /// Create a new layer forwarding to `transport`.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Return the wrapped transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

impl<S, T> Layer<S> for TransportLayer<T>
where
    S: Subscriber,
    T: Transport + ?Sized + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_ignored_target(metadata.target()) {
            return;
        }

        let level = syslog_level(metadata.level());
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let _ = self
            .transport
            .log(level.as_str(), collector.into_record(level));
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    error: Option<ErrorInfo>,
    extra: ExtraFields,
}

impl FieldCollector {
    fn into_record(mut self, level: Level) -> LogRecord {
        let message = match (self.error, self.message) {
            (Some(error), text) => {
                if let Some(text) = text {
                    self.extra.insert("message", text);
                }
                LogMessage::Error(error)
            }
            (None, text) => LogMessage::Text(text.unwrap_or_default()),
        };
        LogRecord::new(level.as_str(), message).with_extra(self.extra)
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else if !field.name().starts_with("log.") {
            self.extra.insert(field.name(), value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.extra.insert(field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.extra.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if !field.name().starts_with("log.") {
            self.extra.insert(field.name(), value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.extra.insert(field.name(), value);
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.error = Some(ErrorInfo::from_error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else if !field.name().starts_with("log.") {
            self.extra.insert(field.name(), format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::sync::broadcast;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::error::TransportError;
    use crate::transport::{LogDispatch, TransportEvent};

    #[derive(Default)]
    struct CaptureTransport {
        records: Mutex<Vec<(String, LogRecord)>>,
    }

    impl Transport for CaptureTransport {
        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "capture"
        }

        fn level(&self) -> Level {
            Level::Debug
        }

        fn set_level(&self, _level: &str) -> Result<(), TransportError> {
            Ok(())
        }

        fn log(&self, level: &str, record: LogRecord) -> LogDispatch {
            self.records
                .lock()
                .unwrap()
                .push((level.to_owned(), record));
            LogDispatch::Sent
        }

        fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
            broadcast::channel(1).1
        }
    }

    fn capture<F: FnOnce()>(f: F) -> Vec<(String, LogRecord)> {
        let transport = Arc::new(CaptureTransport::default());
        let subscriber =
            tracing_subscriber::registry().with(TransportLayer::new(Arc::clone(&transport)));
        tracing::subscriber::with_default(subscriber, f);
        let records = transport.records.lock().unwrap();
        records.clone()
    }

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct ConnectError;

    #[test]
    fn maps_tracing_levels() {
        assert_eq!(syslog_level(&tracing::Level::ERROR), Level::Error);
        assert_eq!(syslog_level(&tracing::Level::WARN), Level::Warning);
        assert_eq!(syslog_level(&tracing::Level::INFO), Level::Info);
        assert_eq!(syslog_level(&tracing::Level::DEBUG), Level::Debug);
        assert_eq!(syslog_level(&tracing::Level::TRACE), Level::Debug);
    }

    #[test]
    fn message_and_fields_are_collected() {
        let records = capture(|| {
            tracing::warn!(target: "billing", user = "alice", attempt = 3, "card declined");
        });

        assert_eq!(records.len(), 1);
        let (level, record) = &records[0];
        assert_eq!(level, "warning");
        assert_eq!(record.message, LogMessage::Text("card declined".into()));
        assert_eq!(
            record.extra.to_json(),
            serde_json::json!({"user": "alice", "attempt": 3})
        );
    }

    #[test]
    fn error_fields_become_error_messages() {
        let records = capture(|| {
            let err = ConnectError;
            tracing::error!(
                target: "db",
                error = &err as &(dyn std::error::Error + 'static),
                "query failed"
            );
        });

        let (_, record) = &records[0];
        match &record.message {
            LogMessage::Error(info) => assert_eq!(info.message, "connection refused"),
            LogMessage::Text(text) => panic!("expected error message, got {text}"),
        }
        assert_eq!(
            record.extra.to_json(),
            serde_json::json!({"message": "query failed"})
        );
    }

    #[test]
    fn own_and_http_targets_are_ignored() {
        let records = capture(|| {
            tracing::warn!(target: "slackhook_slack::transport", "delivery failed");
            tracing::debug!(target: "hyper_util::client", "connecting");
            tracing::info!(target: "reqwest::connect", "tls handshake");
            tracing::info!(target: "app", "kept");
        });

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.message, LogMessage::Text("kept".into()));
    }
}

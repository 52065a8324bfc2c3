use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use reqwest::{Client, Url};
use slackhook_core::{Level, LogRecord, SlackPayload, WebhookBody};
use slackhook_transport::{DropReason, LogDispatch, Transport, TransportError, TransportEvent};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, broadcast};
use tracing::{debug, instrument, warn};

use crate::config::SlackConfig;
use crate::environment::process_vars;
use crate::error::SlackError;
use crate::formatter::{FormatContext, Formatted, format_record};

/// Buffered lifecycle events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Transport that posts log records to a Slack incoming webhook.
///
/// `log` formats the record on the caller's thread and hands the HTTP
/// request to the ambient tokio runtime; it returns as soon as the request
/// is dispatched. Delivery outcomes are published as [`TransportEvent`]s.
///
/// A transport whose webhook URL is empty or invalid is constructed in a
/// disabled state. It still formats records, so a suppressed startup
/// announcement reaches the console, but never sends a payload.
pub struct SlackTransport {
    config: SlackConfig,
    client: Client,
    endpoint: Option<Url>,
    level: AtomicU8,
    permits: Arc<Semaphore>,
    events: broadcast::Sender<TransportEvent>,
}

impl SlackTransport {
    /// Create a transport with a client configured from `config.timeout`.
    pub fn new(config: SlackConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build configured HTTP client, using defaults");
                Client::new()
            });
        Self::with_client(config, client)
    }

    /// Create a transport that sends through an existing client.
    ///
    /// Useful for sharing a connection pool with the host application.
    pub fn with_client(config: SlackConfig, client: Client) -> Self {
        let endpoint = parse_endpoint(&config);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            level: AtomicU8::new(config.level.rank()),
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            endpoint,
            client,
            events,
            config,
        }
    }

    /// Whether a usable webhook URL was configured.
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Return the configuration this transport was built with.
    pub fn config(&self) -> &SlackConfig {
        &self.config
    }

    fn fail(&self, level: Level, error: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Failed {
            transport: self.config.name.clone(),
            level,
            error: error.into(),
        });
    }
}

fn parse_endpoint(config: &SlackConfig) -> Option<Url> {
    let raw = config.webhook_url.trim();
    if raw.is_empty() {
        warn!(transport = %config.name, "no Slack webhook URL configured, transport disabled");
        return None;
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            warn!(
                transport = %config.name,
                scheme = url.scheme(),
                "unsupported webhook URL scheme, transport disabled"
            );
            None
        }
        Err(e) => {
            warn!(transport = %config.name, error = %e, "invalid webhook URL, transport disabled");
            None
        }
    }
}

impl Transport for SlackTransport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn level(&self) -> Level {
        Level::from_rank(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    fn set_level(&self, level: &str) -> Result<(), TransportError> {
        let level: Level = level.parse()?;
        self.level.store(level.rank(), Ordering::Relaxed);
        debug!(transport = %self.config.name, %level, "transport level changed");
        Ok(())
    }

    fn log(&self, level: &str, record: LogRecord) -> LogDispatch {
        let Some(level) = Level::from_name(level) else {
            return LogDispatch::Dropped(DropReason::UnknownLevel(level.to_owned()));
        };
        if !level.passes(self.level()) {
            return LogDispatch::Filtered;
        }

        let env_vars = if self.is_enabled()
            && self.config.log_environment
            && record.message.is_error()
        {
            process_vars(&self.config.env_allow_prefixes)
        } else {
            Vec::new()
        };
        let ctx = FormatContext {
            level,
            config: &self.config,
            env_vars: &env_vars,
        };
        let payload = match format_record(&record, &ctx) {
            Formatted::Payload(payload) => payload,
            Formatted::Suppressed { console_line } => {
                let _ = writeln!(std::io::stdout().lock(), "{console_line}");
                return LogDispatch::Suppressed;
            }
        };
        let Some(endpoint) = self.endpoint.clone() else {
            return LogDispatch::Disabled;
        };

        let Ok(runtime) = Handle::try_current() else {
            self.fail(level, "no async runtime available");
            return LogDispatch::Dropped(DropReason::NoRuntime);
        };
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            self.fail(level, "too many webhook requests in flight");
            return LogDispatch::Dropped(DropReason::Saturated);
        };

        let delivery = Delivery {
            client: self.client.clone(),
            endpoint,
            transport: self.config.name.clone(),
            unfurl_links: self.config.unfurl_links,
            unfurl_media: self.config.unfurl_media,
            mrkdwn: self.config.mrkdwn,
            events: self.events.clone(),
        };
        runtime.spawn(async move {
            let _permit = permit;
            delivery.run(level, payload).await;
        });
        LogDispatch::Sent
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

/// Everything a background request needs, detached from the transport.
struct Delivery {
    client: Client,
    endpoint: Url,
    transport: String,
    unfurl_links: bool,
    unfurl_media: bool,
    mrkdwn: bool,
    events: broadcast::Sender<TransportEvent>,
}

impl Delivery {
    #[instrument(skip_all, fields(transport = %self.transport, %level))]
    async fn run(self, level: Level, payload: SlackPayload) {
        let event = match self.post(&payload).await {
            Ok(()) => {
                debug!(parts = payload.part_count(), "posted log record to Slack");
                TransportEvent::Logged {
                    transport: self.transport.clone(),
                    level,
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to post log record to Slack");
                TransportEvent::Failed {
                    transport: self.transport.clone(),
                    level,
                    error: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event);
    }

    async fn post(&self, payload: &SlackPayload) -> Result<(), SlackError> {
        let body = WebhookBody {
            payload,
            unfurl_links: self.unfurl_links,
            unfurl_media: self.unfurl_media,
            mrkdwn: self.mrkdwn,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

//! Slack incoming-webhook transport for slackhook.
//!
//! This crate implements the [`Transport`](slackhook_transport::Transport)
//! trait, posting each log record as one Block Kit message to a Slack
//! incoming webhook. Records carry an optional HTTP request and arbitrary
//! extra fields, which are rendered as quoted JSON code blocks.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use slackhook_core::{Level, LogRecord};
//! use slackhook_slack::{SlackConfig, SlackTransport};
//! use slackhook_transport::{Transport, TransportRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // Directly
//! let config = SlackConfig::new("https://hooks.slack.com/services/T000/B000/XXXX")
//!     .with_level(Level::Warning)
//!     .with_environment("production");
//! let transport = SlackTransport::new(config);
//! transport.log("error", LogRecord::new("error", "payment gateway timed out"));
//!
//! // Through the driver registry, with configuration from the environment
//! let mut registry = TransportRegistry::new();
//! slackhook_slack::register(&mut registry);
//! let config = slackhook_slack::SlackConfig::resolve(&[
//!     slackhook_slack::PartialConfig::from_env()?,
//! ])?;
//! let transport: Arc<dyn Transport> = registry.create(&config.driver, &config)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod formatter;
pub mod transport;

use std::sync::Arc;

use slackhook_transport::{Transport, TransportRegistry};

pub use config::{PartialConfig, PayloadMode, SlackConfig};
pub use error::{ConfigError, SlackError};
pub use formatter::{FormatContext, Formatted, STARTUP_TEMPLATE, format_record};
pub use transport::SlackTransport;

/// Driver name this crate registers under.
pub const DRIVER: &str = "slack";

/// Register the Slack driver with `registry`.
pub fn register(registry: &mut TransportRegistry<SlackConfig>) {
    registry.register(DRIVER, |config: &SlackConfig| {
        let transport: Arc<dyn Transport> = Arc::new(SlackTransport::new(config.clone()));
        Ok(transport)
    });
}

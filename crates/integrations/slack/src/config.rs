//! Transport configuration and its resolution from layered sources.
//!
//! A [`SlackConfig`] is resolved from an ordered list of [`PartialConfig`]
//! layers: for every field the first layer that sets it wins, and fields no
//! layer sets take their defaults. Hosts typically pass
//! `[PartialConfig::from_env()?, PartialConfig::from_toml(&file)?]` so that
//! environment variables override the configuration file.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use slackhook_core::Level;

use crate::error::ConfigError;

/// Default request timeout for webhook calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default cap on concurrently outstanding webhook requests.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
pub const DEFAULT_NAME: &str = "slackhook";
pub const DEFAULT_DRIVER: &str = "slack";
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Shape of the outgoing message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadMode {
    /// One Block Kit section per part.
    #[default]
    Blocks,
    /// A single `text` field with parts joined by newlines.
    Text,
}

impl FromStr for PayloadMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocks" => Ok(Self::Blocks),
            "text" => Ok(Self::Text),
            _ => Err(ConfigError::InvalidPayloadMode(s.to_owned())),
        }
    }
}

/// Fully resolved configuration for a [`SlackTransport`](crate::SlackTransport).
#[derive(Clone)]
pub struct SlackConfig {
    /// Logical transport name.
    pub name: String,
    /// Driver name the transport is registered under.
    pub driver: String,
    /// Incoming-webhook URL. Empty or malformed disables the transport.
    pub webhook_url: String,
    /// Minimum severity forwarded.
    pub level: Level,
    /// Forward the "serving app" startup announcement instead of printing it.
    pub app_start: bool,
    /// Append allow-listed environment variables to error records.
    pub log_environment: bool,
    /// Deployment label shown next to the level.
    pub environment: String,
    pub payload_mode: PayloadMode,
    pub unfurl_links: bool,
    pub unfurl_media: bool,
    pub mrkdwn: bool,
    /// Name prefixes of the environment variables included by `log_environment`.
    pub env_allow_prefixes: Vec<String>,
    /// Host substituted into the startup announcement.
    pub startup_host: Option<String>,
    /// Port substituted into the startup announcement.
    pub startup_port: Option<String>,
    pub timeout: Duration,
    pub max_in_flight: usize,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .field("webhook_url", &"[REDACTED]")
            .field("level", &self.level)
            .field("app_start", &self.app_start)
            .field("log_environment", &self.log_environment)
            .field("environment", &self.environment)
            .field("payload_mode", &self.payload_mode)
            .field("env_allow_prefixes", &self.env_allow_prefixes)
            .field("timeout", &self.timeout)
            .field("max_in_flight", &self.max_in_flight)
            .finish_non_exhaustive()
    }
}

impl SlackConfig {
    /// Create a configuration posting to `webhook_url` with all defaults.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            driver: DEFAULT_DRIVER.to_owned(),
            webhook_url: webhook_url.into(),
            level: Level::Info,
            app_start: false,
            log_environment: false,
            environment: DEFAULT_ENVIRONMENT.to_owned(),
            payload_mode: PayloadMode::Blocks,
            unfurl_links: false,
            unfurl_media: false,
            mrkdwn: false,
            env_allow_prefixes: Vec::new(),
            startup_host: None,
            startup_port: None,
            timeout: DEFAULT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Set the transport name reported in events.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the minimum severity.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Send the startup announcement to Slack instead of the console.
    #[must_use]
    pub fn with_app_start(mut self, app_start: bool) -> Self {
        self.app_start = app_start;
        self
    }

    /// Enable the environment section for error records, limited to
    /// variables whose names start with one of `prefixes`.
    #[must_use]
    pub fn with_log_environment<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log_environment = true;
        self.env_allow_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the environment label shown after the level.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set the shape of the outgoing message.
    #[must_use]
    pub fn with_payload_mode(mut self, mode: PayloadMode) -> Self {
        self.payload_mode = mode;
        self
    }

    /// Set the host and port substituted into the startup announcement.
    #[must_use]
    pub fn with_startup_address(
        mut self,
        host: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        self.startup_host = Some(host.into());
        self.startup_port = Some(port.into());
        self
    }

    /// Set the request timeout for webhook calls.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cap on concurrently outstanding webhook requests.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Resolve a configuration from `layers`, highest precedence first.
    pub fn resolve(layers: &[PartialConfig]) -> Result<Self, ConfigError> {
        fn pick<T: Clone>(
            layers: &[PartialConfig],
            f: impl Fn(&PartialConfig) -> &Option<T>,
        ) -> Option<T> {
            layers.iter().find_map(|layer| f(layer).clone())
        }

        let defaults = Self::new(String::new());

        let level = match pick(layers, |l| &l.level) {
            Some(name) => Level::from_name(&name).ok_or(ConfigError::InvalidLevel(name))?,
            None => defaults.level,
        };

        Ok(Self {
            name: pick(layers, |l| &l.name).unwrap_or(defaults.name),
            driver: pick(layers, |l| &l.driver).unwrap_or(defaults.driver),
            webhook_url: pick(layers, |l| &l.webhook_url).unwrap_or_default(),
            level,
            app_start: pick(layers, |l| &l.app_start).unwrap_or(defaults.app_start),
            log_environment: pick(layers, |l| &l.log_environment)
                .unwrap_or(defaults.log_environment),
            environment: pick(layers, |l| &l.environment).unwrap_or(defaults.environment),
            payload_mode: pick(layers, |l| &l.payload_mode).unwrap_or(defaults.payload_mode),
            unfurl_links: pick(layers, |l| &l.unfurl_links).unwrap_or(defaults.unfurl_links),
            unfurl_media: pick(layers, |l| &l.unfurl_media).unwrap_or(defaults.unfurl_media),
            mrkdwn: pick(layers, |l| &l.mrkdwn).unwrap_or(defaults.mrkdwn),
            env_allow_prefixes: pick(layers, |l| &l.env_allow_prefixes)
                .unwrap_or(defaults.env_allow_prefixes),
            startup_host: pick(layers, |l| &l.startup_host),
            startup_port: pick(layers, |l| &l.startup_port),
            timeout: pick(layers, |l| &l.timeout_secs)
                .map_or(defaults.timeout, Duration::from_secs),
            max_in_flight: pick(layers, |l| &l.max_in_flight).unwrap_or(defaults.max_in_flight),
        })
    }
}

/// One configuration source. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub name: Option<String>,
    pub driver: Option<String>,
    pub webhook_url: Option<String>,
    pub level: Option<String>,
    pub app_start: Option<bool>,
    pub log_environment: Option<bool>,
    pub environment: Option<String>,
    pub payload_mode: Option<PayloadMode>,
    pub unfurl_links: Option<bool>,
    pub unfurl_media: Option<bool>,
    pub mrkdwn: Option<bool>,
    pub env_allow_prefixes: Option<Vec<String>>,
    pub startup_host: Option<String>,
    pub startup_port: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_in_flight: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    logger: LoggerSection,
}

#[derive(Debug, Default, Deserialize)]
struct LoggerSection {
    #[serde(default)]
    slack: PartialConfig,
}

impl PartialConfig {
    /// Read the `[logger.slack]` table of a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        Ok(file.logger.slack)
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read variables through `lookup`. Empty values count as unset.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_bool = |key: &str| get(key).map(|v| parse_bool(key, &v)).transpose();

        Ok(Self {
            name: get("SLACK_LOG_NAME"),
            driver: get("SLACK_LOG_DRIVER"),
            webhook_url: get("SLACK_WEBHOOK_URL"),
            level: get("SLACK_LOG_LEVEL"),
            app_start: get_bool("SLACK_LOG_APP_START")?,
            log_environment: get_bool("SLACK_LOG_ENVIRONMENT")?,
            environment: get("APP_ENV"),
            payload_mode: get("SLACK_LOG_PAYLOAD_MODE")
                .map(|v| v.parse())
                .transpose()?,
            unfurl_links: get_bool("SLACK_LOG_UNFURL_LINKS")?,
            unfurl_media: get_bool("SLACK_LOG_UNFURL_MEDIA")?,
            mrkdwn: get_bool("SLACK_LOG_MRKDWN")?,
            env_allow_prefixes: get("SLACK_LOG_ENV_PREFIXES").map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_owned)
                    .collect()
            }),
            startup_host: get("HOST"),
            startup_port: get("PORT"),
            timeout_secs: get("SLACK_LOG_TIMEOUT_SECS")
                .map(|v| parse_number("SLACK_LOG_TIMEOUT_SECS", &v))
                .transpose()?,
            max_in_flight: get("SLACK_LOG_MAX_IN_FLIGHT")
                .map(|v| parse_number("SLACK_LOG_MAX_IN_FLIGHT", &v))
                .transpose()?,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

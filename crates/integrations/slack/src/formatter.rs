//! Rendering of log records into Slack messages.
//!
//! A record becomes up to five parts, in order: the primary line, the
//! request, its headers, the extra fields and the environment. In
//! [`PayloadMode::Blocks`] every part is its own section; in
//! [`PayloadMode::Text`] parts are joined by newlines. Formatting never
//! fails: values that cannot be rendered degrade to their plain JSON text.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use slackhook_core::{Block, ErrorInfo, Level, LogMessage, LogRecord, SlackPayload};

use crate::config::{PayloadMode, SlackConfig};

/// Announcement logged by the host when its HTTP server starts. The two
/// placeholders are replaced by host and port.
pub const STARTUP_TEMPLATE: &str = "serving app on http://%s:%s";

/// Maximum length of a section's text accepted by Slack.
pub const SECTION_TEXT_LIMIT: usize = 3000;

/// Room kept for a code block body when its header would fill the section.
const BODY_RESERVE: usize = 200;

/// Characters added around a code block body: `\n>```` and the closing fence.
const CODE_BLOCK_OVERHEAD: usize = 8;

const TRUNCATION_MARKER: char = '…';

/// Everything the formatter needs besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    /// Resolved level of the record.
    pub level: Level,
    pub config: &'a SlackConfig,
    /// Allow-listed environment variables, used for error records when
    /// `log_environment` is on.
    pub env_vars: &'a [(String, String)],
}

/// Result of formatting a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatted {
    /// Send this payload.
    Payload(SlackPayload),
    /// Do not send anything; print `console_line` locally instead.
    Suppressed { console_line: String },
}

/// Render `record` for Slack.
pub fn format_record(record: &LogRecord, ctx: &FormatContext<'_>) -> Formatted {
    let config = ctx.config;
    let limit = section_limit(config.payload_mode);
    let label = format!("{} [{}]", ctx.level, config.environment);
    let mut parts = Vec::new();

    match &record.message {
        LogMessage::Error(error) => parts.push(error_line(&label, error, limit)),
        LogMessage::Text(text) => {
            let text = if text == STARTUP_TEMPLATE {
                let text = expand_startup(config);
                if !config.app_start {
                    return Formatted::Suppressed {
                        console_line: format!("{label} : {text}"),
                    };
                }
                Cow::Owned(text)
            } else {
                Cow::Borrowed(text.as_str())
            };
            let line = format!("*{label} :* {text}");
            parts.push(fit(&line, limit).into_owned());
        }
    }

    if let Some(request) = &record.request {
        if let Some(all) = request.all() {
            let header = format!("*{}*: `{}`", request.method(), request.url());
            parts.push(quoted_code(&header, &pretty_json(&all), limit));
        }
        if let Some(headers) = request.headers() {
            parts.push(quoted_code("*HEADERS:*", &pretty_json(&headers), limit));
        }
    }

    if !record.extra.is_empty() {
        parts.push(quoted_code(
            "*Extra:*",
            &pretty_json(&record.extra.to_json()),
            limit,
        ));
    }

    if config.log_environment && record.message.is_error() && !ctx.env_vars.is_empty() {
        let vars: serde_json::Map<String, Value> = ctx
            .env_vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        parts.push(quoted_code(
            "*Environment:*",
            &pretty_json(&Value::Object(vars)),
            limit,
        ));
    }

    Formatted::Payload(assemble(parts, config.payload_mode))
}

/// Only Block Kit sections are length-limited; a `text` payload is not.
fn section_limit(mode: PayloadMode) -> Option<usize> {
    match mode {
        PayloadMode::Blocks => Some(SECTION_TEXT_LIMIT),
        PayloadMode::Text => None,
    }
}

fn error_line(label: &str, error: &ErrorInfo, limit: Option<usize>) -> String {
    let header = format!("*{label}:* _{}_ - {}", error.name, error.message);
    match &error.stack {
        Some(stack) => quoted_code(&header, stack, limit),
        None => fit(&header, limit).into_owned(),
    }
}

/// Substitute host then port into [`STARTUP_TEMPLATE`]. Missing values
/// render as empty strings.
fn expand_startup(config: &SlackConfig) -> String {
    let host = config.startup_host.as_deref().unwrap_or_default();
    let port = config.startup_port.as_deref().unwrap_or_default();
    STARTUP_TEMPLATE
        .replacen("%s", host, 1)
        .replacen("%s", port, 1)
}

/// `header`, then `body` in a quoted code block. With a limit the header
/// keeps priority and the body gets whatever room is left.
fn quoted_code(header: &str, body: &str, limit: Option<usize>) -> String {
    let Some(limit) = limit else {
        return format!("{header}\n>```{body}```");
    };
    let room = limit.saturating_sub(CODE_BLOCK_OVERHEAD);
    let header = truncate(header, room.saturating_sub(BODY_RESERVE));
    let body = truncate(body, room.saturating_sub(header.chars().count()));
    format!("{header}\n>```{body}```")
}

fn fit(text: &str, limit: Option<usize>) -> Cow<'_, str> {
    match limit {
        Some(limit) => truncate(text, limit),
        None => Cow::Borrowed(text),
    }
}

fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.chars().count() <= max_chars {
        return Cow::Borrowed(text);
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push(TRUNCATION_MARKER);
    Cow::Owned(cut)
}

/// JSON with four-space indentation.
fn pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    if value.serialize(&mut ser).is_err() {
        return value.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
}

fn assemble(parts: Vec<String>, mode: PayloadMode) -> SlackPayload {
    match mode {
        PayloadMode::Blocks => SlackPayload::Blocks {
            blocks: parts.into_iter().map(Block::section).collect(),
        },
        PayloadMode::Text => SlackPayload::Text {
            text: parts.join("\n"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use slackhook_core::{HttpRequestInfo, SharedObject};

    use super::*;

    fn config() -> SlackConfig {
        SlackConfig::new("https://hooks.slack.test/x").with_environment("test")
    }

    fn format(record: &LogRecord, config: &SlackConfig) -> Formatted {
        format_with_env(record, config, &[])
    }

    fn format_with_env(
        record: &LogRecord,
        config: &SlackConfig,
        env_vars: &[(String, String)],
    ) -> Formatted {
        let level = Level::from_name(&record.level).unwrap_or_default();
        let ctx = FormatContext {
            level,
            config,
            env_vars,
        };
        format_record(record, &ctx)
    }

    fn blocks(formatted: Formatted) -> Vec<String> {
        match formatted {
            Formatted::Payload(SlackPayload::Blocks { blocks }) => {
                blocks.into_iter().map(|b| b.text.text).collect()
            }
            other => panic!("expected block payload, got {other:?}"),
        }
    }

    #[test]
    fn plain_message_is_a_single_section() {
        let record = LogRecord::new("warning", "disk at 91%");
        let sections = blocks(format(&record, &config()));
        assert_eq!(sections, vec!["*WARNING [test] :* disk at 91%"]);
    }

    #[test]
    fn error_message_includes_name_message_and_stack() {
        let error = ErrorInfo::new("TypeError", "cannot read id").with_stack("at handler (app.rs:10)");
        let record = LogRecord::new("error", error);
        let sections = blocks(format(&record, &config()));

        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0],
            "*ERROR [test]:* _TypeError_ - cannot read id\n>```at handler (app.rs:10)```"
        );
    }

    #[test]
    fn error_without_stack_has_no_code_block() {
        let record = LogRecord::new("crit", ErrorInfo::new("Panic", "worker died"));
        let sections = blocks(format(&record, &config()));
        assert_eq!(sections, vec!["*CRIT [test]:* _Panic_ - worker died"]);
    }

    #[test]
    fn request_headers_and_extra_sections_follow_in_order() {
        let request = HttpRequestInfo::new("POST", "/orders")
            .with_params(json!({"sku": "A-1"}))
            .with_headers(json!({"x-request-id": "abc"}));
        let record = LogRecord::new("info", "order placed")
            .with_request(Arc::new(request))
            .with_field("tenant", "acme");

        let sections = blocks(format(&record, &config()));
        assert_eq!(sections.len(), 4);
        assert_eq!(
            sections[1],
            "*POST*: `/orders`\n>```{\n    \"sku\": \"A-1\"\n}```"
        );
        assert_eq!(
            sections[2],
            "*HEADERS:*\n>```{\n    \"x-request-id\": \"abc\"\n}```"
        );
        assert_eq!(
            sections[3],
            "*Extra:*\n>```{\n    \"tenant\": \"acme\"\n}```"
        );
    }

    #[test]
    fn request_without_params_skips_request_section() {
        let request = HttpRequestInfo::new("GET", "/health").with_headers(json!({"accept": "*/*"}));
        let record = LogRecord::new("info", "probe").with_request(Arc::new(request));
        let sections = blocks(format(&record, &config()));
        assert_eq!(sections.len(), 2);
        assert!(sections[1].starts_with("*HEADERS:*"));
    }

    #[test]
    fn self_referencing_extra_is_rendered_once() {
        let node = SharedObject::new();
        node.insert("id", 1_i64);
        node.insert("parent", node.clone());
        let record = LogRecord::new("debug", "tree").with_field("node", node.clone());

        let cfg = config().with_level(Level::Debug);
        let sections = blocks(format(&record, &cfg));
        assert_eq!(
            sections[1],
            "*Extra:*\n>```{\n    \"node\": {\n        \"id\": 1\n    }\n}```"
        );

        node.remove("parent");
    }

    #[test]
    fn formatting_is_repeatable() {
        let record = LogRecord::new("notice", "deploy finished").with_field("version", "1.4.2");
        let cfg = config();
        assert_eq!(format(&record, &cfg), format(&record, &cfg));
    }

    #[test]
    fn startup_announcement_is_suppressed_by_default() {
        let cfg = config().with_startup_address("localhost", "3000");
        let record = LogRecord::new("info", STARTUP_TEMPLATE);

        match format(&record, &cfg) {
            Formatted::Suppressed { console_line } => {
                assert_eq!(
                    console_line,
                    "INFO [test] : serving app on http://localhost:3000"
                );
            }
            other => panic!("expected suppression, got {other:?}"),
        }
    }

    #[test]
    fn startup_announcement_is_sent_when_enabled() {
        let cfg = config()
            .with_startup_address("localhost", "3000")
            .with_app_start(true);
        let record = LogRecord::new("info", STARTUP_TEMPLATE);
        let sections = blocks(format(&record, &cfg));
        assert_eq!(
            sections,
            vec!["*INFO [test] :* serving app on http://localhost:3000"]
        );
    }

    #[test]
    fn other_messages_are_never_suppressed() {
        let record = LogRecord::new("info", "serving app on http://example:80");
        assert!(matches!(format(&record, &config()), Formatted::Payload(_)));
    }

    #[test]
    fn environment_section_only_for_errors() {
        let cfg = config().with_log_environment(["APP_"]);
        let env = vec![("APP_REGION".to_owned(), "eu-west-1".to_owned())];

        let error = LogRecord::new("error", ErrorInfo::new("Error", "boom"));
        let sections = blocks(format_with_env(&error, &cfg, &env));
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections[1],
            "*Environment:*\n>```{\n    \"APP_REGION\": \"eu-west-1\"\n}```"
        );

        let text = LogRecord::new("error", "boom");
        assert_eq!(blocks(format_with_env(&text, &cfg, &env)).len(), 1);
    }

    #[test]
    fn environment_section_needs_the_flag() {
        let env = vec![("APP_REGION".to_owned(), "eu-west-1".to_owned())];
        let error = LogRecord::new("error", ErrorInfo::new("Error", "boom"));
        assert_eq!(blocks(format_with_env(&error, &config(), &env)).len(), 1);
    }

    #[test]
    fn text_mode_joins_parts() {
        let cfg = config().with_payload_mode(PayloadMode::Text);
        let record = LogRecord::new("info", "hello").with_field("n", 1_i64);
        match format(&record, &cfg) {
            Formatted::Payload(SlackPayload::Text { text }) => assert_eq!(
                text,
                "*INFO [test] :* hello\n*Extra:*\n>```{\n    \"n\": 1\n}```"
            ),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn long_sections_are_cut_to_the_limit() {
        let stack = "frame\n".repeat(2000);
        let error = ErrorInfo::new("Overflow", "deep recursion").with_stack(stack);
        let record = LogRecord::new("error", error);
        let sections = blocks(format(&record, &config()));

        let section = &sections[0];
        assert!(section.chars().count() <= SECTION_TEXT_LIMIT);
        assert!(section.ends_with("…```"));

        let long = LogRecord::new("info", "x".repeat(5000));
        let sections = blocks(format(&long, &config()));
        assert_eq!(sections[0].chars().count(), SECTION_TEXT_LIMIT);
    }

    #[test]
    fn long_error_message_is_kept_whole_before_the_stack() {
        let message = "m".repeat(1500);
        let error = ErrorInfo::new("Error", message.clone()).with_stack("at f");
        let sections = blocks(format(&LogRecord::new("error", error), &config()));

        assert_eq!(
            sections[0],
            format!("*ERROR [test]:* _Error_ - {message}\n>```at f```")
        );

        let error = ErrorInfo::new("Error", "m".repeat(4000)).with_stack("frame\n".repeat(1000));
        let sections = blocks(format(&LogRecord::new("error", error), &config()));
        assert!(sections[0].chars().count() <= SECTION_TEXT_LIMIT);
        assert!(sections[0].contains("…\n>```"));
        assert!(sections[0].ends_with("…```"));
    }

    #[test]
    fn text_mode_is_not_cut_to_the_section_limit() {
        let cfg = config().with_payload_mode(PayloadMode::Text);
        let stack = "frame\n".repeat(1000);
        let error = ErrorInfo::new("Overflow", "deep recursion").with_stack(stack.clone());
        let record = LogRecord::new("error", error).with_field("blob", "y".repeat(4000));

        match format(&record, &cfg) {
            Formatted::Payload(SlackPayload::Text { text }) => {
                assert!(text.contains(&format!(">```{stack}```")));
                assert!(text.contains(&"y".repeat(4000)));
                assert!(!text.contains('…'));
            }
            other => panic!("expected text payload, got {other:?}"),
        }
    }
}

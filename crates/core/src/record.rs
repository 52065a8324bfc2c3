use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::extra::{ExtraFields, ExtraValue};

/// Error-like message content: a name, a message and an optional stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorInfo {
    /// Create a new error description without a stack.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Attach a stack trace.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture an error and its `source()` chain.
    ///
    /// The chain, one cause per line, becomes the stack. Errors without a
    /// source have no stack.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        Self {
            name: "Error".to_owned(),
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }
}

/// The message carried by a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMessage {
    Text(String),
    Error(ErrorInfo),
}

impl LogMessage {
    /// Return `true` if the message describes an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<&str> for LogMessage {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for LogMessage {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ErrorInfo> for LogMessage {
    fn from(info: ErrorInfo) -> Self {
        Self::Error(info)
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Error(e) => write!(f, "{}: {}", e.name, e.message),
        }
    }
}

/// Accessors for the HTTP request a record was logged under.
///
/// `all` and `headers` return `None` when the request cannot provide them;
/// the corresponding sections are then left out of the message.
pub trait RequestContext: Send + Sync + fmt::Debug {
    fn method(&self) -> String;

    fn url(&self) -> String;

    /// All request parameters (query and body merged).
    fn all(&self) -> Option<Value> {
        None
    }

    fn headers(&self) -> Option<Value> {
        None
    }
}

/// Owned snapshot of a request, for hosts without their own request type.
#[derive(Debug, Clone, Default)]
pub struct HttpRequestInfo {
    pub method: String,
    pub url: String,
    pub params: Option<Value>,
    pub headers: Option<Value>,
}

impl HttpRequestInfo {
    /// Create a new request snapshot with no parameters or headers.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            params: None,
            headers: None,
        }
    }

    /// Set the merged request parameters reported by `all`.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Value) -> Self {
        self.headers = Some(headers);
        self
    }
}

impl RequestContext for HttpRequestInfo {
    fn method(&self) -> String {
        self.method.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn all(&self) -> Option<Value> {
        self.params.clone()
    }

    fn headers(&self) -> Option<Value> {
        self.headers.clone()
    }
}

/// A single log event handed to a transport.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Level name as given by the caller.
    pub level: String,
    pub message: LogMessage,
    pub request: Option<Arc<dyn RequestContext>>,
    pub extra: ExtraFields,
}

impl LogRecord {
    /// Create a new record at the named level with no request or extra fields.
    pub fn new(level: impl Into<String>, message: impl Into<LogMessage>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
            request: None,
            extra: ExtraFields::new(),
        }
    }

    /// Attach the HTTP request the record was logged for.
    #[must_use]
    pub fn with_request(mut self, request: Arc<dyn RequestContext>) -> Self {
        self.request = Some(request);
        self
    }

    /// Add or replace one extra field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.extra.insert(name, value);
        self
    }

    /// Replace all extra fields.
    #[must_use]
    pub fn with_extra(mut self, extra: ExtraFields) -> Self {
        self.extra = extra;
        self
    }
}

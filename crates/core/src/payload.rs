use serde::Serialize;

// ─── Message content ─────────────────────────────────────────────────

/// Block Kit `section` block holding a markdown text object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "section")]
pub struct Block {
    pub text: TextObject,
}

/// Block Kit text object. Only `mrkdwn` is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "mrkdwn")]
pub struct TextObject {
    pub text: String,
}

impl Block {
    /// Create a section block with `mrkdwn` text.
    pub fn section(text: impl Into<String>) -> Self {
        Self {
            text: TextObject { text: text.into() },
        }
    }
}

/// Message content sent to the webhook: flat text or a list of sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SlackPayload {
    Text { text: String },
    Blocks { blocks: Vec<Block> },
}

impl SlackPayload {
    /// Number of content parts: sections in block mode, one in text mode.
    pub fn part_count(&self) -> usize {
        match self {
            Self::Text { .. } => 1,
            Self::Blocks { blocks } => blocks.len(),
        }
    }

    /// All text content, sections joined by newlines.
    pub fn text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Blocks { blocks } => blocks
                .iter()
                .map(|b| b.text.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

// ─── Request body ────────────────────────────────────────────────────

/// Full JSON body of an incoming-webhook POST.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookBody<'a> {
    #[serde(flatten)]
    pub payload: &'a SlackPayload,
    pub unfurl_links: bool,
    pub unfurl_media: bool,
    pub mrkdwn: bool,
}

//! Conversation data model and Markdown document assembly.
//!
//! A [`Conversation`] is what one run extracts from a share page: the page
//! title, the ordered [`Message`]s, the source URL and the retrieval time.
//! [`assemble`] turns it into a [`Document`]:
//!
//! ```text
//! # ChatGPT Conversation: <title>
//!
//! Source: <url>
//! Retrieved: <timestamp>
//!
//! ## Assistant
//!
//! <message markdown>
//! ```

pub mod html;

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::convert::{MarkdownConverter, collapse_blank_lines};

pub use html::render_html_document;

/// Heading prefix of the assembled document.
pub const DOCUMENT_HEADING: &str = "ChatGPT Conversation";

#[allow(clippy::expect_used)]
static TITLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^ChatGPT\s*-?\s*").expect("title prefix regex is valid"));

/// Errors raised while assembling a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// The page yielded no messages. Not retried.
    #[error("no messages were found in the shared conversation")]
    EmptyConversation,
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    /// Any other `data-message-author-role` value. Rendered as a user turn.
    Unknown,
}

impl Role {
    /// Maps a `data-message-author-role` attribute value to a role.
    #[must_use]
    pub fn from_attribute(value: &str) -> Self {
        match value.trim() {
            "assistant" => Self::Assistant,
            "user" => Self::User,
            _ => Self::Unknown,
        }
    }

    /// Section heading text used for this role.
    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            Self::Assistant => "Assistant",
            Self::User | Self::Unknown => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One conversation turn as extracted from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    /// Raw inner HTML of the message node.
    pub html: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, html: impl Into<String>) -> Self {
        Self {
            role,
            html: html.into(),
        }
    }
}

/// Everything one run extracted from a share page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Page title, possibly still carrying the `ChatGPT -` prefix.
    pub title: String,
    /// Messages in conversation order.
    pub messages: Vec<Message>,
    /// The URL the page was requested from.
    pub source_url: String,
    pub retrieved_at: DateTime<Utc>,
}

impl Conversation {
    /// Title with the `ChatGPT -` prefix removed.
    #[must_use]
    pub fn display_title(&self) -> &str {
        strip_title_prefix(&self.title)
    }

    /// Retrieval time as an ISO-8601 UTC timestamp with milliseconds.
    #[must_use]
    pub fn retrieved_at_iso(&self) -> String {
        format_timestamp(&self.retrieved_at)
    }
}

/// Final Markdown text.
///
/// Contains no U+2028/U+2029 separators and no run of three or more newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    markdown: String,
}

impl Document {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.markdown
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.markdown
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.markdown
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markdown)
    }
}

/// Removes a leading case-insensitive `ChatGPT` (optionally followed by `-`).
#[must_use]
pub fn strip_title_prefix(title: &str) -> &str {
    TITLE_PREFIX
        .find(title)
        .map_or(title, |prefix| &title[prefix.end()..])
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Replaces U+2028 and U+2029 with `\n`, then collapses blank-line runs.
#[must_use]
pub fn normalize_line_terminators(text: &str) -> String {
    collapse_blank_lines(&text.replace(['\u{2028}', '\u{2029}'], "\n"))
}

/// Builds the Markdown document for `conversation`.
///
/// Each message is sanitized and converted with `converter`; message order
/// is preserved.
///
/// # Errors
///
/// Returns [`AssembleError::EmptyConversation`] when there are no messages.
#[instrument(skip_all, fields(messages = conversation.messages.len()))]
pub fn assemble(
    conversation: &Conversation,
    converter: &MarkdownConverter,
) -> Result<Document, AssembleError> {
    if conversation.messages.is_empty() {
        return Err(AssembleError::EmptyConversation);
    }

    let mut lines = vec![
        format!("# {DOCUMENT_HEADING}: {}", conversation.display_title()),
        String::new(),
        format!("Source: {}", conversation.source_url),
        format!("Retrieved: {}", conversation.retrieved_at_iso()),
        String::new(),
    ];

    for message in &conversation.messages {
        lines.push(format!("## {}", message.role.heading()));
        lines.push(String::new());
        lines.push(converter.convert_message(&message.html));
        lines.push(String::new());
    }

    let markdown = normalize_line_terminators(&lines.join("\n"));
    debug!(bytes = markdown.len(), "assembled document");
    Ok(Document { markdown })
}

//! Types for repeat detection.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Decision produced for a single inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatAction {
    /// Nothing to do.
    None,
    /// Send `content` back to `group_id` verbatim.
    Echo {
        /// Group the echo goes to.
        group_id: String,
        /// Exact text to resend.
        content: String,
    },
}

impl RepeatAction {
    /// Whether this action asks for an echo.
    #[must_use]
    pub const fn is_echo(&self) -> bool {
        matches!(self, Self::Echo { .. })
    }
}

/// Inbound message as extracted by the transport.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    /// Conversation identifier, if the transport could resolve one.
    pub group_id: Option<String>,
    /// Whether the message was posted to a group conversation.
    pub is_group: bool,
    /// Plain text body, `None` for media-only messages.
    pub plain_text: Option<String>,
}

impl IncomingMessage {
    /// Convenience constructor for a text message posted to a group.
    #[must_use]
    pub fn group_text(group_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            group_id: Some(group_id.into()),
            is_group: true,
            plain_text: Some(text.into()),
        }
    }
}

/// Record of the last echo emitted for a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastRepeat {
    /// Content that was echoed.
    pub content: String,
    /// When the echo was triggered.
    pub timestamp: DateTime<Utc>,
}

/// Errors produced while delivering an echo.
#[derive(Debug, Error)]
pub enum SendError {
    /// Group identifier could not be mapped to a transport chat.
    #[error("invalid group id: {0}")]
    InvalidGroup(String),
    /// Transport rejected or failed the request.
    #[error("transport failure: {0}")]
    Transport(String),
}

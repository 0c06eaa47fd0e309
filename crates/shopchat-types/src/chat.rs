//! Chat message types for the assistant widget.
//!
//! These types represent the message log the widget renders as bubbles.
//! An assistant message is created empty when the first response byte
//! arrives and grows as fragments stream in; it is sealed on a terminal
//! condition and immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message from the shopper, the assistant, or the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: String,
    /// Who sent this message
    pub role: ChatRole,
    /// Message text content (may be partial during streaming)
    pub content: String,
    /// Whether content is still being streamed
    #[serde(default)]
    pub is_streaming: bool,
    /// Whether the message is fully complete
    #[serde(default)]
    pub is_complete: bool,
    /// Message timestamp (ms since Unix epoch). For assistant messages this
    /// is the arrival of the first response byte, not the request time.
    pub timestamp: u64,
}

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Shopper's prompt
    User,
    /// Assistant's response
    Assistant,
    /// Injected notices (greetings, offline banners)
    System,
}

/// Connection status of the chat session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No request in flight
    #[default]
    Idle,
    /// Request issued, no response byte yet
    Connecting,
    /// Response fragments arriving
    Streaming,
    /// Last request ended in a transport or server error
    Error,
}

impl ConnectionStatus {
    /// A send is rejected while the previous one is still in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Streaming)
    }

    /// Terminal states clear the busy window and allow the next send.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionStatus::Idle | ConnectionStatus::Error)
    }
}

impl ChatMessage {
    /// Create a new user message. User messages are terminal immediately.
    pub fn user(content: String) -> Self {
        Self {
            id: format!("user-{}", uuid::Uuid::new_v4()),
            role: ChatRole::User,
            content,
            is_streaming: false,
            is_complete: true,
            timestamp: now_ms(),
        }
    }

    /// Create a new assistant message (starts streaming, empty content).
    pub fn assistant() -> Self {
        Self {
            id: format!("assistant-{}", uuid::Uuid::new_v4()),
            role: ChatRole::Assistant,
            content: String::new(),
            is_streaming: true,
            is_complete: false,
            timestamp: now_ms(),
        }
    }

    /// Create a system notice. Terminal immediately, like user messages.
    pub fn system(content: String) -> Self {
        Self {
            id: format!("system-{}", uuid::Uuid::new_v4()),
            role: ChatRole::System,
            content,
            is_streaming: false,
            is_complete: true,
            timestamp: now_ms(),
        }
    }

    /// Append content to a streaming message.
    pub fn append_content(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    /// Seal the message. Content is immutable from here on.
    pub fn complete(&mut self) {
        self.is_streaming = false;
        self.is_complete = true;
    }

    /// RFC3339 rendering of the timestamp for host bridges.
    pub fn created_at(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp as i64)
            .unwrap_or_default()
            .to_rfc3339()
    }
}

/// Get current time in milliseconds since Unix epoch.
fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

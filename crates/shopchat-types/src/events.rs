//! Session events broadcast to observers of the chat session.
//!
//! The widget coordinator and the presentation layer both subscribe to this
//! stream; it is the only channel through which one component learns about
//! another component's state changes.

use crate::{ChatMessage, ConnectionStatus};
use serde::{Deserialize, Serialize};

/// Event emitted by the chat session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new message was appended to the log (user or assistant).
    Message { message: ChatMessage },
    /// Content was appended to the in-flight assistant message.
    ContentDelta { message_id: String, delta: String },
    /// The in-flight assistant message was sealed by a successful stream
    /// (including tolerated implicit completion).
    ///
    /// This is the sole trigger for unread accounting; error-sealed messages
    /// surface through `StreamFailed` instead.
    MessageComplete { message_id: String },
    /// Connection status changed.
    StatusChanged { status: ConnectionStatus },
    /// The stream ended in a transport or server error.
    StreamFailed { message: String },
}

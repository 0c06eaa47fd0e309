//! Wire types for the streaming assistant endpoint.
//!
//! The endpoint accepts a POST with a JSON body and answers with
//! newline-delimited JSON objects, one fragment per line.

use serde::{Deserialize, Serialize};

/// Request body sent to the streaming endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// One decoded unit of a streamed response.
///
/// A fragment carries incremental content, terminal signaling, or both.
/// Unknown fields are ignored so the endpoint can grow its protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamFragment {
    /// Incremental assistant text, appended in arrival order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Set on the final fragment of a successful response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    /// Server-reported failure; terminal like `done`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamFragment {
    /// Whether this fragment ends the stream (`done` or `error`).
    pub fn is_terminal(&self) -> bool {
        self.done == Some(true) || self.error.is_some()
    }
}

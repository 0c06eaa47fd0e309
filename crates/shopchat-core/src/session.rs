//! Chat session store: message log, connection status, send entry point.
//!
//! One `ChatSession` lives per mounted widget and is discarded on unmount;
//! nothing persists. The store owns all session state and is the only writer
//! of it — other components observe through the event channel.

use crate::assembler::StreamCycle;
use crate::transport::{CredentialProvider, StreamingTransport};
use shopchat_types::{ChatMessage, ConnectionStatus, SessionEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Mutable session state. Append-only message log except for the in-flight
/// assistant message, which grows until sealed.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) messages: Vec<ChatMessage>,
    /// The single in-flight assistant message.
    /// Invariant: `Some` iff `status == Streaming`.
    pub(crate) current: Option<ChatMessage>,
    pub(crate) status: ConnectionStatus,
    /// Cleared on the next accepted send.
    pub(crate) last_error: Option<String>,
    /// Last stream closed without `done`/`error`; still counted as success.
    pub(crate) possibly_truncated: bool,
}

/// What `send_message` did with the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message appended, stream started.
    Accepted,
    /// A stream is already in flight; the call was a no-op.
    RejectedBusy,
    /// Empty or whitespace-only text; the call was a no-op.
    RejectedEmpty,
}

/// The chat session store.
pub struct ChatSession {
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    transport: Arc<dyn StreamingTransport>,
    credentials: Arc<dyn CredentialProvider>,
    detached: Arc<AtomicBool>,
}

impl ChatSession {
    pub fn new(
        transport: Arc<dyn StreamingTransport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            events,
            transport,
            credentials,
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Send a message to the assistant.
    ///
    /// Rejected while a previous stream is in flight (reject-while-busy: no
    /// queueing) and for blank text. The user message is appended to the log
    /// before the network request is issued, so typed input survives even
    /// when the endpoint is unreachable.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SendOutcome::RejectedEmpty;
        }

        {
            let mut state = self.state.write().await;
            if state.status.is_busy() {
                debug!(target: "shopchat::session", "Send rejected: stream in flight");
                return SendOutcome::RejectedBusy;
            }

            state.last_error = None;
            state.possibly_truncated = false;

            let message = ChatMessage::user(trimmed.to_string());
            let _ = self.events.send(SessionEvent::Message {
                message: message.clone(),
            });
            state.messages.push(message);

            state.status = ConnectionStatus::Connecting;
            let _ = self.events.send(SessionEvent::StatusChanged {
                status: ConnectionStatus::Connecting,
            });
        }

        let cycle = StreamCycle::new(
            self.state.clone(),
            self.events.clone(),
            self.detached.clone(),
        );
        let transport = self.transport.clone();
        let bearer = self.credentials.bearer_token();
        let prompt = trimmed.to_string();
        tokio::spawn(async move {
            cycle.run(transport, prompt, bearer).await;
        });

        SendOutcome::Accepted
    }

    /// The full message log, in-flight message included.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        let state = self.state.read().await;
        let mut messages = state.messages.clone();
        if let Some(current) = &state.current {
            messages.push(current.clone());
        }
        messages
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.read().await.status
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Whether the last completed stream may have been cut short.
    pub async fn possibly_truncated(&self) -> bool {
        self.state.read().await.possibly_truncated
    }

    /// The assistant is "typing" while a request is in flight.
    pub async fn is_typing(&self) -> bool {
        self.state.read().await.status.is_busy()
    }

    /// Stop any in-flight cycle from mutating state. Called at unmount; the
    /// network call itself is not synchronously tied to the widget lifetime.
    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

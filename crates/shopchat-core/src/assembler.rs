//! Drives one request/response cycle against the streaming endpoint.
//!
//! A cycle owns the read side of a single stream: open the transport, create
//! the in-flight assistant message on the first response byte, apply decoded
//! fragments in arrival order, and settle on exactly one terminal condition
//! (done, server error, transport failure, or implicit completion). The
//! session store owns the write side (`send_message`) and never runs two
//! cycles at once.

use crate::decoder::FragmentDecoder;
use crate::session::SessionState;
use crate::transport::StreamingTransport;
use futures::StreamExt;
use shopchat_types::{ChatMessage, ConnectionStatus, SessionEvent, StreamFragment};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

pub(crate) struct StreamCycle {
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    /// Set at unmount. Once raised, the cycle releases the reader and stops
    /// mutating state; the network call is not synchronously tied to the
    /// widget lifetime.
    detached: Arc<AtomicBool>,
}

impl StreamCycle {
    pub(crate) fn new(
        state: Arc<RwLock<SessionState>>,
        events: broadcast::Sender<SessionEvent>,
        detached: Arc<AtomicBool>,
    ) -> Self {
        Self {
            state,
            events,
            detached,
        }
    }

    /// Run the cycle to its terminal condition.
    pub(crate) async fn run(
        self,
        transport: Arc<dyn StreamingTransport>,
        prompt: String,
        bearer: Option<String>,
    ) {
        let mut stream = match transport.open(&prompt, bearer.as_deref()).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(e.to_string()).await;
                return;
            }
        };

        let mut decoder = FragmentDecoder::new();
        let mut started = false;

        while let Some(item) = stream.next().await {
            if self.detached.load(Ordering::SeqCst) {
                return;
            }

            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.fail(e.to_string()).await;
                    return;
                }
            };

            if !started {
                started = true;
                self.begin_streaming().await;
            }

            for fragment in decoder.push_chunk(&chunk) {
                if self.apply(fragment).await {
                    return;
                }
            }
        }

        if self.detached.load(Ordering::SeqCst) {
            return;
        }

        // Reader finished without a terminal fragment. A final unterminated
        // line may still be buffered.
        if let Some(fragment) = decoder.finish() {
            if self.apply(fragment).await {
                return;
            }
        }
        self.complete_implicit().await;
    }

    /// First response byte arrived: create the in-flight assistant message.
    async fn begin_streaming(&self) {
        let mut state = self.state.write().await;
        let message = ChatMessage::assistant();
        let _ = self.events.send(SessionEvent::Message {
            message: message.clone(),
        });
        state.current = Some(message);
        Self::set_status(&mut state, &self.events, ConnectionStatus::Streaming);
    }

    /// Apply one fragment. Returns true when the fragment was terminal.
    ///
    /// A fragment may carry both content and a terminal flag; content is
    /// applied first so nothing is dropped.
    async fn apply(&self, fragment: StreamFragment) -> bool {
        if self.detached.load(Ordering::SeqCst) {
            return true;
        }
        let mut state = self.state.write().await;

        if let Some(delta) = fragment.content.as_deref() {
            if let Some(message) = state.current.as_mut() {
                message.append_content(delta);
                let message_id = message.id.clone();
                let _ = self.events.send(SessionEvent::ContentDelta {
                    message_id,
                    delta: delta.to_string(),
                });
            }
        }

        if let Some(error) = fragment.error {
            // Server-reported failure: content already received stays.
            Self::seal_current(&mut state, &self.events, false);
            state.last_error = Some(error.clone());
            Self::set_status(&mut state, &self.events, ConnectionStatus::Error);
            let _ = self.events.send(SessionEvent::StreamFailed { message: error });
            return true;
        }

        if fragment.done == Some(true) {
            Self::seal_current(&mut state, &self.events, true);
            Self::set_status(&mut state, &self.events, ConnectionStatus::Idle);
            return true;
        }

        false
    }

    /// The stream closed with no `done`/`error` seen: tolerated as success.
    /// The truncation bit lets the seam tell the two apart.
    async fn complete_implicit(&self) {
        let mut state = self.state.write().await;
        state.possibly_truncated = true;
        Self::seal_current(&mut state, &self.events, true);
        Self::set_status(&mut state, &self.events, ConnectionStatus::Idle);
        debug!(
            target: "shopchat::stream",
            "Stream closed without a terminal fragment; treating as complete"
        );
    }

    /// Transport-level failure: seal the partial message as-is, record the
    /// error, stop. Retry is user-initiated, never automatic.
    async fn fail(&self, message: String) {
        if self.detached.load(Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.write().await;
        Self::seal_current(&mut state, &self.events, false);
        state.last_error = Some(message.clone());
        Self::set_status(&mut state, &self.events, ConnectionStatus::Error);
        let _ = self.events.send(SessionEvent::StreamFailed {
            message: message.clone(),
        });
        warn!(target: "shopchat::stream", "Stream failed: {}", message);
    }

    /// Seal the in-flight message and move it into the log. Only successful
    /// completions emit `MessageComplete` (the unread-accounting trigger).
    fn seal_current(
        state: &mut SessionState,
        events: &broadcast::Sender<SessionEvent>,
        successful: bool,
    ) {
        if let Some(mut message) = state.current.take() {
            message.complete();
            if successful {
                let _ = events.send(SessionEvent::MessageComplete {
                    message_id: message.id.clone(),
                });
            }
            state.messages.push(message);
        }
    }

    fn set_status(
        state: &mut SessionState,
        events: &broadcast::Sender<SessionEvent>,
        status: ConnectionStatus,
    ) {
        if state.status != status {
            state.status = status;
            let _ = events.send(SessionEvent::StatusChanged { status });
        }
    }
}

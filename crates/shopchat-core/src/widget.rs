//! Widget lifecycle coordinator: the seam between engine and presentation.
//!
//! Owns open/closed, unread accounting, and the aux-menu flag; composes the
//! chat session and the anchor tracker into one cohesive contract. Mounting
//! is the subsystem's single scoped acquisition — the session listener and
//! the tracker subscriptions are installed exactly once, and the returned
//! controller is the disposer.

use crate::anchor::AnchorOffsets;
use crate::config::AnchorConfig;
use crate::locator::{AnchorLocator, PageProbe};
use crate::session::{ChatSession, SendOutcome};
use crate::tracker::{AnchorTracker, AnchorTrackerHandle, LayoutSignal};
use serde::Serialize;
use shopchat_types::{ChatMessage, ConnectionStatus, SessionEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tracing::debug;

/// Widget-owned state. The anchor is deliberately absent here: it lives in
/// the tracker's watch channel and is never written by anything else.
#[derive(Debug, Default, Clone)]
pub struct WidgetState {
    pub is_open: bool,
    pub unread_count: u32,
    pub aux_menu_open: bool,
}

/// Everything the presentation layer renders, in one cohesive snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetSnapshot {
    pub is_open: bool,
    pub unread_count: u32,
    pub aux_menu_open: bool,
    pub anchor: AnchorOffsets,
    pub status: ConnectionStatus,
    pub is_typing: bool,
    pub messages: Vec<ChatMessage>,
    pub last_error: Option<String>,
}

/// The mounted widget subsystem.
pub struct WidgetController {
    session: Arc<ChatSession>,
    state: Arc<RwLock<WidgetState>>,
    tracker: AnchorTrackerHandle,
    listener: tokio::task::JoinHandle<()>,
}

impl WidgetController {
    /// Mount the widget subsystem.
    ///
    /// Installs the session-event listener and spawns the anchor tracker.
    /// Never call twice for the same widget instance; `unmount` the returned
    /// controller instead and mount a fresh one.
    pub fn mount(
        session: Arc<ChatSession>,
        probe: Arc<dyn PageProbe>,
        locator: AnchorLocator,
        anchor_config: AnchorConfig,
        signals: mpsc::UnboundedReceiver<LayoutSignal>,
    ) -> Self {
        let tracker = AnchorTracker::spawn(probe, locator, anchor_config, signals);
        let state = Arc::new(RwLock::new(WidgetState::default()));

        let listener = tokio::spawn(unread_listener(session.subscribe(), state.clone()));

        Self {
            session,
            state,
            tracker,
            listener,
        }
    }

    /// Open the panel. Opening is the sole "mark as read" trigger.
    pub async fn open(&self) {
        let mut state = self.state.write().await;
        if !state.is_open {
            state.is_open = true;
            if state.unread_count > 0 {
                debug!(
                    target: "shopchat::widget",
                    "Opened with {} unread; resetting",
                    state.unread_count
                );
            }
            state.unread_count = 0;
        }
    }

    /// Close the panel. Also the handler for the escape key, which the
    /// presentation layer forwards here.
    pub async fn close(&self) {
        self.state.write().await.is_open = false;
    }

    /// Toggle the auxiliary actions menu. Independent of open/closed.
    pub async fn toggle_aux_menu(&self) {
        let mut state = self.state.write().await;
        state.aux_menu_open = !state.aux_menu_open;
    }

    /// Close the aux menu; the presentation layer's outside-click detector
    /// calls this.
    pub async fn close_aux_menu(&self) {
        self.state.write().await.aux_menu_open = false;
    }

    /// Send a message through the session (reject-while-busy applies).
    pub async fn send(&self, text: &str) -> SendOutcome {
        self.session.send_message(text).await
    }

    /// Current anchor offsets.
    pub fn anchor(&self) -> AnchorOffsets {
        self.tracker.offsets()
    }

    /// Watch the anchor for changes.
    pub fn anchor_watch(&self) -> watch::Receiver<AnchorOffsets> {
        self.tracker.watch()
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.is_open
    }

    pub async fn unread_count(&self) -> u32 {
        self.state.read().await.unread_count
    }

    pub async fn aux_menu_open(&self) -> bool {
        self.state.read().await.aux_menu_open
    }

    /// Subscribe to session events (message log updates, status changes).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// One cohesive snapshot for the presentation layer.
    pub async fn snapshot(&self) -> WidgetSnapshot {
        let widget = self.state.read().await.clone();
        WidgetSnapshot {
            is_open: widget.is_open,
            unread_count: widget.unread_count,
            aux_menu_open: widget.aux_menu_open,
            anchor: self.tracker.offsets(),
            status: self.session.status().await,
            is_typing: self.session.is_typing().await,
            messages: self.session.messages().await,
            last_error: self.session.last_error().await,
        }
    }

    /// Unmount: tear down the listener and the tracker, and stop any
    /// in-flight stream from mutating session state.
    pub fn unmount(self) {
        self.session.detach();
        self.listener.abort();
        self.tracker.stop();
    }
}

/// Counts completed assistant messages that arrive while the panel is closed.
async fn unread_listener(
    mut events: broadcast::Receiver<SessionEvent>,
    state: Arc<RwLock<WidgetState>>,
) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageComplete { .. }) => {
                let mut state = state.write().await;
                if !state.is_open {
                    state.unread_count += 1;
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(
                    target: "shopchat::widget",
                    "Unread listener lagged, {} events skipped",
                    skipped
                );
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

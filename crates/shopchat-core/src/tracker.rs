//! Async tracker keeping the widget anchor in sync with the page.
//!
//! The tracker owns the anchor value: it recomputes on layout signals from
//! the host (coalesced to at most one recomputation per frame) and, when the
//! reference element has not appeared yet and the host cannot announce it,
//! falls back to a bounded poll loop that cancels itself on first resolution.

use crate::anchor::{compute_anchor, AnchorOffsets, AnchorPolicy, ElementRect};
use crate::config::AnchorConfig;
use crate::locator::{AnchorLocator, PageProbe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Layout change notifications from the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSignal {
    /// Viewport was resized.
    ViewportResized,
    /// Page scrolled.
    Scrolled,
    /// The reference element moved or changed size.
    ReferenceChanged,
    /// The reference element appeared after initial layout. Hosts that can
    /// deliver this make the poll loop unnecessary.
    ReferenceAppeared,
}

/// Handle owning the tracker task; dropping it without [`stop`] leaves the
/// task running until the signal channel closes.
///
/// [`stop`]: AnchorTrackerHandle::stop
pub struct AnchorTrackerHandle {
    offsets_rx: watch::Receiver<AnchorOffsets>,
    stop_tx: mpsc::UnboundedSender<()>,
}

impl AnchorTrackerHandle {
    /// Current anchor offsets.
    pub fn offsets(&self) -> AnchorOffsets {
        *self.offsets_rx.borrow()
    }

    /// Watch the anchor for changes.
    pub fn watch(&self) -> watch::Receiver<AnchorOffsets> {
        self.offsets_rx.clone()
    }

    /// Tear the tracker down: the task exits, pending polling is canceled,
    /// and the offsets stop updating.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
    }
}

pub struct AnchorTracker;

impl AnchorTracker {
    /// Spawn the tracker task.
    ///
    /// Subscriptions live exactly as long as the returned handle: the widget
    /// coordinator installs them once per mount and tears them down on
    /// unmount.
    pub fn spawn(
        probe: Arc<dyn PageProbe>,
        locator: AnchorLocator,
        config: AnchorConfig,
        mut signals: mpsc::UnboundedReceiver<LayoutSignal>,
    ) -> AnchorTrackerHandle {
        let policy = config.policy;
        let mut reference = locator.resolve(probe.as_ref());
        let initial = compute_anchor(policy, &probe.viewport(), reference.as_ref());
        let (offsets_tx, offsets_rx) = watch::channel(initial);
        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();

        tokio::spawn(async move {
            let mut frame = tokio::time::interval(Duration::from_millis(config.frame_interval_ms));
            frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut poll = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
            poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Polling covers the reference appearing asynchronously after
            // initial layout. Hosts that announce appearance don't need it,
            // and neither does the fixed policy.
            let mut poll_budget = if policy == AnchorPolicy::Floating
                && reference.is_none()
                && matches!(locator, AnchorLocator::Heuristic(_))
                && !probe.notifies_appearance()
            {
                config.poll_budget
            } else {
                0
            };

            let mut dirty = false;

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,

                    signal = signals.recv() => {
                        match signal {
                            Some(LayoutSignal::ReferenceAppeared) => {
                                reference = locator.resolve(probe.as_ref());
                                // The notification supersedes any polling
                                poll_budget = 0;
                                dirty = true;
                            }
                            Some(LayoutSignal::ReferenceChanged) => {
                                reference = locator.resolve(probe.as_ref());
                                dirty = true;
                            }
                            Some(LayoutSignal::ViewportResized) | Some(LayoutSignal::Scrolled) => {
                                dirty = true;
                            }
                            // Host dropped its side; nothing left to track
                            None => break,
                        }
                    }

                    // Coalesce: however many signals arrived, one recompute
                    // per frame at most.
                    _ = frame.tick(), if dirty => {
                        dirty = false;
                        publish(&offsets_tx, policy, probe.as_ref(), reference.as_ref());
                    }

                    _ = poll.tick(), if poll_budget > 0 => {
                        poll_budget -= 1;
                        if let Some(rect) = locator.resolve(probe.as_ref()) {
                            reference = Some(rect);
                            // Self-cancel once the reference is found
                            poll_budget = 0;
                            publish(&offsets_tx, policy, probe.as_ref(), reference.as_ref());
                        } else if poll_budget == 0 {
                            debug!(
                                target: "shopchat::anchor",
                                "Reference element never appeared; keeping fallback offsets"
                            );
                        }
                    }
                }
            }
        });

        AnchorTrackerHandle {
            offsets_rx,
            stop_tx,
        }
    }
}

fn publish(
    tx: &watch::Sender<AnchorOffsets>,
    policy: AnchorPolicy,
    probe: &dyn PageProbe,
    reference: Option<&ElementRect>,
) {
    let next = compute_anchor(policy, &probe.viewport(), reference);
    tx.send_if_modified(|current| {
        if *current != next {
            *current = next;
            true
        } else {
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Viewport;
    use crate::locator::{LocatorHint, PageElement};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Probe whose viewport and reference element can change under the
    /// tracker, like a live page.
    struct MovingPage {
        viewport: Mutex<Viewport>,
        rect: Mutex<Option<ElementRect>>,
        notifies: bool,
    }

    impl MovingPage {
        fn new(rect: Option<ElementRect>) -> Self {
            Self {
                viewport: Mutex::new(Viewport::new(1300.0, 900.0)),
                rect: Mutex::new(rect),
                notifies: false,
            }
        }

        fn set_rect(&self, rect: Option<ElementRect>) {
            *self.rect.lock().unwrap() = rect;
        }

        fn set_viewport(&self, viewport: Viewport) {
            *self.viewport.lock().unwrap() = viewport;
        }
    }

    impl PageProbe for MovingPage {
        fn viewport(&self) -> Viewport {
            *self.viewport.lock().unwrap()
        }

        fn find_by_attribute(&self, name: &str, value: &str) -> Option<ElementRect> {
            if name == "data-role" && value == "primary-action" {
                *self.rect.lock().unwrap()
            } else {
                None
            }
        }

        fn find_by_text(&self, _needle: &str) -> Option<ElementRect> {
            None
        }

        fn find_by_class(&self, _class: &str) -> Option<ElementRect> {
            None
        }

        fn candidates(&self) -> Vec<PageElement> {
            Vec::new()
        }

        fn notifies_appearance(&self) -> bool {
            self.notifies
        }
    }

    fn locator() -> AnchorLocator {
        AnchorLocator::Heuristic(vec![LocatorHint::Attribute {
            name: "data-role".to_string(),
            value: "primary-action".to_string(),
        }])
    }

    fn fast_config() -> AnchorConfig {
        AnchorConfig {
            policy: AnchorPolicy::Floating,
            frame_interval_ms: 1,
            poll_interval_ms: 10,
            poll_budget: 100,
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_poll_finds_late_reference_then_cancels() {
        let page = Arc::new(MovingPage::new(None));
        let (_signals_tx, signals_rx) = mpsc::unbounded_channel();
        let handle = AnchorTracker::spawn(page.clone(), locator(), fast_config(), signals_rx);

        // Reference missing: static floating default for the wide breakpoint
        assert_eq!(handle.offsets().bottom, 96.0);

        // Element appears; the poll loop picks it up
        page.set_rect(Some(ElementRect::new(810.0, 0.0, 80.0, 40.0)));
        wait_until(|| handle.offsets().bottom == 62.0).await;

        // Polling has self-canceled: moving the element without a signal
        // changes nothing
        page.set_rect(Some(ElementRect::new(700.0, 0.0, 80.0, 40.0)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.offsets().bottom, 62.0);

        handle.stop();
    }

    #[tokio::test]
    async fn test_reference_changed_signal_recomputes() {
        let page = Arc::new(MovingPage::new(Some(ElementRect::new(810.0, 0.0, 80.0, 40.0))));
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let handle = AnchorTracker::spawn(page.clone(), locator(), fast_config(), signals_rx);

        assert_eq!(handle.offsets().bottom, 62.0);

        page.set_rect(Some(ElementRect::new(760.0, 0.0, 80.0, 40.0)));
        signals_tx.send(LayoutSignal::ReferenceChanged).unwrap();
        wait_until(|| handle.offsets().bottom == 112.0).await;

        handle.stop();
    }

    #[tokio::test]
    async fn test_resize_signal_recomputes_breakpoint() {
        let page = Arc::new(MovingPage::new(None));
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let handle = AnchorTracker::spawn(page.clone(), locator(), fast_config(), signals_rx);

        assert_eq!(handle.offsets().right, 32.0);

        page.set_viewport(Viewport::new(400.0, 800.0));
        signals_tx.send(LayoutSignal::ViewportResized).unwrap();
        wait_until(|| handle.offsets().right == 16.0).await;

        handle.stop();
    }

    #[tokio::test]
    async fn test_poll_budget_exhausts() {
        let page = Arc::new(MovingPage::new(None));
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let config = AnchorConfig {
            poll_interval_ms: 5,
            poll_budget: 3,
            ..fast_config()
        };
        let handle = AnchorTracker::spawn(page.clone(), locator(), config, signals_rx);

        // Let the budget run out, then make the element appear
        tokio::time::sleep(Duration::from_millis(100)).await;
        page.set_rect(Some(ElementRect::new(810.0, 0.0, 80.0, 40.0)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.offsets().bottom, 96.0);

        // The host notification path still works after exhaustion
        signals_tx.send(LayoutSignal::ReferenceAppeared).unwrap();
        wait_until(|| handle.offsets().bottom == 62.0).await;

        handle.stop();
    }

    #[tokio::test]
    async fn test_notifying_host_skips_polling() {
        let mut page = MovingPage::new(None);
        page.notifies = true;
        let page = Arc::new(page);

        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let handle = AnchorTracker::spawn(page.clone(), locator(), fast_config(), signals_rx);

        // Element appears but no poll loop is running
        page.set_rect(Some(ElementRect::new(810.0, 0.0, 80.0, 40.0)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.offsets().bottom, 96.0);

        signals_tx.send(LayoutSignal::ReferenceAppeared).unwrap();
        wait_until(|| handle.offsets().bottom == 62.0).await;

        handle.stop();
    }

    #[tokio::test]
    async fn test_stop_tears_down_subscriptions() {
        let page = Arc::new(MovingPage::new(Some(ElementRect::new(810.0, 0.0, 80.0, 40.0))));
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let handle = AnchorTracker::spawn(page.clone(), locator(), fast_config(), signals_rx);

        let watch = handle.watch();
        handle.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        page.set_rect(Some(ElementRect::new(700.0, 0.0, 80.0, 40.0)));
        let _ = signals_tx.send(LayoutSignal::ReferenceChanged);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(watch.borrow().bottom, 62.0);
    }

    #[tokio::test]
    async fn test_fixed_policy_ignores_reference() {
        let page = Arc::new(MovingPage::new(Some(ElementRect::new(810.0, 0.0, 80.0, 40.0))));
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let config = AnchorConfig {
            policy: AnchorPolicy::Fixed,
            ..fast_config()
        };
        let handle = AnchorTracker::spawn(page.clone(), locator(), config, signals_rx);

        assert_eq!(handle.offsets().bottom, 24.0);

        page.set_rect(Some(ElementRect::new(100.0, 0.0, 80.0, 40.0)));
        signals_tx.send(LayoutSignal::ReferenceChanged).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.offsets().bottom, 24.0);

        handle.stop();
    }
}

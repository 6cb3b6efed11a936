//! Fire-and-forget fan-out of telemetry messages
//!
//! Each subscriber owns a bounded channel. `publish` never blocks: it tries
//! every subscriber once under the registry lock, and any subscriber whose
//! channel is closed or full is dropped from the registry. One failing
//! subscriber never affects delivery to the others.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::types::{TelemetryEvent, TelemetryMessage};

/// Identifier handed out to each subscriber
pub type SubscriberId = u64;

/// Default per-subscriber buffer size
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Receiving end of one subscription
///
/// Dropping it unsubscribes on the next publish.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<TelemetryMessage>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next message; `None` once the subscriber was dropped
    pub async fn recv(&mut self) -> Option<TelemetryMessage> {
        self.receiver.recv().await
    }

    /// Take the next message if one is already buffered
    pub fn try_recv(&mut self) -> Option<TelemetryMessage> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Debug)]
struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<TelemetryMessage>,
}

/// Registry of subscribers and the publish entry point
#[derive(Debug)]
pub struct TelemetryBroadcaster {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl TelemetryBroadcaster {
    /// Create a broadcaster whose subscribers buffer up to `buffer` messages
    ///
    /// A zero buffer is raised to one.
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription {
        self.register(None)
    }

    /// Register a new subscriber whose first message is `initial`
    ///
    /// `initial` is queued before the subscriber becomes visible to
    /// `publish`, so nothing can overtake it.
    pub fn subscribe_with(&self, initial: TelemetryEvent) -> Subscription {
        self.register(Some(initial))
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        subscribers.len() != before
    }

    /// Deliver an event to every current subscriber
    pub fn publish(&self, event: TelemetryEvent) {
        let message = TelemetryMessage::now(event);
        let mut subscribers = self.subscribers.lock();

        subscribers.retain(|subscriber| match subscriber.sender.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    subscriber = subscriber.id,
                    "subscriber buffer full, dropping subscriber"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = subscriber.id, "subscriber disconnected");
                false
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn register(&self, initial: Option<TelemetryEvent>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);

        if let Some(event) = initial {
            // Fresh channel with capacity >= 1, cannot be full or closed.
            let _ = sender.try_send(TelemetryMessage::now(event));
        }

        let mut subscribers = self.subscribers.lock();
        subscribers.push(Subscriber { id, sender });
        debug!(subscriber = id, total = subscribers.len(), "subscriber connected");

        Subscription { id, receiver }
    }
}

impl Default for TelemetryBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MonitoringStatus;

    fn status_event() -> TelemetryEvent {
        TelemetryEvent::MonitoringStatus {
            status: MonitoringStatus::Running,
        }
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let broadcaster = TelemetryBroadcaster::new(8);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        broadcaster.publish(status_event());

        assert_eq!(first.try_recv().map(|m| m.event), Some(status_event()));
        assert_eq!(second.try_recv().map(|m| m.event), Some(status_event()));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let broadcaster = TelemetryBroadcaster::default();

        broadcaster.publish(status_event());

        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_removed_and_others_still_receive() {
        let broadcaster = TelemetryBroadcaster::new(8);
        let gone = broadcaster.subscribe();
        let mut alive = broadcaster.subscribe();
        drop(gone);

        broadcaster.publish(status_event());

        assert_eq!(broadcaster.subscriber_count(), 1);
        assert!(alive.try_recv().is_some());
    }

    #[test]
    fn test_full_subscriber_is_dropped() {
        let broadcaster = TelemetryBroadcaster::new(1);
        let mut slow = broadcaster.subscribe();
        let mut fast = broadcaster.subscribe();

        broadcaster.publish(status_event());
        assert!(fast.try_recv().is_some());
        broadcaster.publish(status_event());

        assert_eq!(broadcaster.subscriber_count(), 1);
        assert!(fast.try_recv().is_some());
        // The slow subscriber keeps what was already buffered, then sees the end.
        assert!(slow.try_recv().is_some());
        assert!(slow.try_recv().is_none());
    }

    #[test]
    fn test_initial_message_arrives_first() {
        let broadcaster = TelemetryBroadcaster::new(8);
        let initial = TelemetryEvent::Reset {
            account: 1,
            balance: 500,
        };
        let mut subscription = broadcaster.subscribe_with(initial.clone());

        broadcaster.publish(status_event());

        assert_eq!(subscription.try_recv().map(|m| m.event), Some(initial));
        assert_eq!(subscription.try_recv().map(|m| m.event), Some(status_event()));
    }

    #[test]
    fn test_unsubscribe() {
        let broadcaster = TelemetryBroadcaster::new(8);
        let subscription = broadcaster.subscribe();

        assert!(broadcaster.unsubscribe(subscription.id()));
        assert!(!broadcaster.unsubscribe(subscription.id()));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_recv_ends_after_drop_from_registry() {
        let broadcaster = TelemetryBroadcaster::new(8);
        let mut subscription = broadcaster.subscribe();

        broadcaster.unsubscribe(subscription.id());

        assert!(subscription.recv().await.is_none());
    }
}

//! Client notification fan-out
//!
//! The engine publishes [`EngineEvent`]s; any number of foreground clients
//! subscribe. Delivery is best-effort and at-most-once: events published
//! with no subscribers are dropped, and a receiver that falls behind the
//! channel capacity loses the overwritten events rather than stalling the
//! engine.

use satchel_core::EventSink;
use satchel_domain::config::BusConfig;
use satchel_domain::EngineEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast channel carrying engine events to subscribed clients.
pub struct NotificationBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl NotificationBus {
    pub fn new(config: &BusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity);
        Self { sender }
    }

    /// A fresh receiver. It only sees events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Currently connected receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for NotificationBus {
    fn publish(&self, event: EngineEvent) {
        // send only errors when nobody is subscribed
        if self.sender.send(event).is_err() {
            trace!("engine event dropped: no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use satchel_domain::ActionSyncedPayload;
    use uuid::Uuid;

    use super::*;

    fn bus() -> NotificationBus {
        NotificationBus::new(&BusConfig::default())
    }

    fn synced_event() -> EngineEvent {
        EngineEvent::ActionSynced(ActionSyncedPayload { action_id: Uuid::new_v4() })
    }

    /// Validates `NotificationBus::publish` behavior with no subscribers.
    ///
    /// Assertions:
    /// - Confirms publishing into an empty bus is silently dropped
    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = bus();
        bus.publish(synced_event());
        assert_eq!(bus.receiver_count(), 0);
    }

    /// Validates fan-out to multiple subscribers.
    ///
    /// Assertions:
    /// - Confirms every subscriber receives its own copy of the event
    #[tokio::test]
    async fn test_all_subscribers_receive_the_event() {
        let bus = bus();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = synced_event();
        bus.publish(event.clone());

        assert_eq!(first.recv().await.ok(), Some(event.clone()));
        assert_eq!(second.recv().await.ok(), Some(event));
    }

    /// Validates that subscription starts at the point of `subscribe`.
    ///
    /// Assertions:
    /// - Confirms a late subscriber does not see earlier events
    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = bus();
        bus.publish(synced_event());

        let mut late = bus.subscribe();
        let follow_up = synced_event();
        bus.publish(follow_up.clone());

        assert_eq!(late.recv().await.ok(), Some(follow_up));
    }
}

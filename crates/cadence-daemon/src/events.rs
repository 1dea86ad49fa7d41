//! Event bus.
//!
//! Oracle and sentry notifications are broadcast to every subscriber. Each
//! subscriber has an independent buffer; slow subscribers lose the oldest
//! events first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cadence_types::events::Event;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "oracle", "sentry", "system".
    pub categories: Option<Vec<String>>,
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        match &self.categories {
            Some(categories) => {
                let category = event.event_type.category();
                categories.iter().any(|c| c == category)
            }
            None => true,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(event_type = ?event.event_type, "event emitted");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_types::events::EventType;

    fn event(event_type: EventType) -> Event {
        Event::new(event_type, 1000, serde_json::json!({}))
    }

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(event(EventType::DaemonStarted));

        let received = rx.try_recv().expect("receive event");
        assert_eq!(received.event_type, EventType::DaemonStarted);
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(event(EventType::Updated));
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_event_filter_categories() {
        let filter = EventFilter {
            categories: Some(vec!["oracle".to_string()]),
        };
        assert!(filter.matches(&event(EventType::Updated)));
        assert!(!filter.matches(&event(EventType::AddSentryStrategy)));
        assert!(EventFilter::default().matches(&event(EventType::ErrorOccurred)));
    }
}

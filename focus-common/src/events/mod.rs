//! Event types for the focus event system
//!
//! Provides the arbitration event definitions and the EventBus observers
//! subscribe to. These events describe decisions taken by the arbiter; they
//! are separate from the listener callbacks delivered to focus holders.

mod focus_types;

pub use focus_types::{FocusChange, FocusGain, FocusResult};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Arbitration event types
///
/// Broadcast via EventBus and serializable for transcripts and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FocusEvent {
    /// A request became the top of the focus stack
    FocusGranted {
        /// Request that was granted
        request_id: Uuid,
        /// Client label of the request
        client: String,
        /// Gain type requested
        gain: FocusGain,
        /// Previous top that was displaced (None if stack was empty or request was already top)
        displaced: Option<Uuid>,
        /// Stack depth after the grant
        stack_depth: usize,
        /// When focus was granted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A holder was displaced and a loss notification was queued for it
    FocusLost {
        /// Displaced request
        request_id: Uuid,
        /// Client label of the displaced request
        client: String,
        /// Loss kind queued for the listener
        change: FocusChange,
        /// When the loss was decided
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A holder became top again after the holder above it abandoned
    FocusRestored {
        /// Restored request
        request_id: Uuid,
        /// Client label of the restored request
        client: String,
        /// When focus was restored
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A holder abandoned focus
    FocusAbandoned {
        /// Abandoning request
        request_id: Uuid,
        /// Client label of the abandoning request
        client: String,
        /// Whether the holder was top of the stack
        was_top: bool,
        /// Stack depth after removal
        stack_depth: usize,
        /// When focus was abandoned
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A notification could not be queued on its execution context
    ///
    /// Never surfaced to the requester; observers only.
    NotificationDropped {
        /// Request whose listener missed the notification
        request_id: Uuid,
        /// Client label of that request
        client: String,
        /// Change that was dropped
        change: FocusChange,
        /// Why delivery was dropped
        reason: String,
        /// When the drop happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl FocusEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            FocusEvent::FocusGranted { .. } => "FocusGranted",
            FocusEvent::FocusLost { .. } => "FocusLost",
            FocusEvent::FocusRestored { .. } => "FocusRestored",
            FocusEvent::FocusAbandoned { .. } => "FocusAbandoned",
            FocusEvent::NotificationDropped { .. } => "NotificationDropped",
        }
    }

    /// Request the event is about
    pub fn request_id(&self) -> Uuid {
        match self {
            FocusEvent::FocusGranted { request_id, .. }
            | FocusEvent::FocusLost { request_id, .. }
            | FocusEvent::FocusRestored { request_id, .. }
            | FocusEvent::FocusAbandoned { request_id, .. }
            | FocusEvent::NotificationDropped { request_id, .. } => *request_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central distribution bus for arbitration events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the arbiter)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// Publishing never requires a running tokio runtime, so the arbiter can emit
/// from any thread while holding its lock.
///
/// # Examples
///
/// ```
/// use focus_common::events::{EventBus, FocusEvent};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(FocusEvent::FocusRestored {
///     request_id: Uuid::new_v4(),
///     client: "music".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FocusEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers lose old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<FocusEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: FocusEvent,
    ) -> Result<usize, broadcast::error::SendError<FocusEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FocusEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restored(client: &str) -> FocusEvent {
        FocusEvent::FocusRestored {
            request_id: Uuid::new_v4(),
            client: client.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_focus_event_serialization_uses_type_tag() {
        let id = Uuid::new_v4();
        let event = FocusEvent::FocusLost {
            request_id: id,
            client: "music".to_string(),
            change: FocusChange::LossTransientCanDuck,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FocusLost");
        assert_eq!(json["change"], "loss_transient_can_duck");
        assert_eq!(json["request_id"], id.to_string());

        let back: FocusEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "FocusLost");
        assert_eq!(back.request_id(), id);
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(restored("nav")).is_err());

        // Lossy emit never panics
        bus.emit_lossy(restored("nav"));
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(restored("first")).unwrap();
        bus.emit(restored("second")).unwrap();

        match rx.recv().await.unwrap() {
            FocusEvent::FocusRestored { client, .. } => assert_eq!(client, "first"),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            FocusEvent::FocusRestored { client, .. } => assert_eq!(client, "second"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_capacity_reported() {
        let bus = EventBus::new(42);
        assert_eq!(bus.capacity(), 42);
    }
}

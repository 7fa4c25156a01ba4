//! Environment lifecycle events for state synchronization.
//!
//! These events are emitted by the runtime and consumed by command
//! surfaces and panels to maintain a synchronized view of environment
//! state. `Busy { busy: true }` strictly precedes a lifecycle operation;
//! `Busy { busy: false }` is emitted in the operation's guaranteed
//! cleanup block regardless of success or failure.

use crate::environment::RuntimeState;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast channel capacity for environment events.
const CHANNEL_CAPACITY: usize = 64;

/// Environment lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EnvironmentEvent {
    /// A lifecycle operation began or finished on the named environment.
    Busy { name: String, busy: bool },

    /// The named environment's runtime state changed.
    State { name: String, state: RuntimeState },
}

impl EnvironmentEvent {
    /// Create a busy-flag transition event.
    pub fn busy(name: impl Into<String>, busy: bool) -> Self {
        Self::Busy {
            name: name.into(),
            busy,
        }
    }

    /// Create a state transition event.
    pub fn state(name: impl Into<String>, state: RuntimeState) -> Self {
        Self::State {
            name: name.into(),
            state,
        }
    }
}

/// Broadcaster for environment lifecycle events.
///
/// Constructed once at the composition root and passed by reference to
/// every consumer; there is no global instance.
pub struct EnvironmentEventBus {
    sender: broadcast::Sender<EnvironmentEvent>,
}

impl EnvironmentEventBus {
    /// Create a new event bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Broadcast an event to all subscribers.
    pub fn emit(&self, event: EnvironmentEvent) {
        // Only log if there are receivers (avoid spam when nothing listens)
        if self.sender.receiver_count() > 0 {
            debug!(?event, "Broadcasting environment event");
            let _ = self.sender.send(event);
        }
    }

    /// Subscribe to environment events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EnvironmentEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EnvironmentEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = EnvironmentEvent::busy("demo", true);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"busy\""));
        assert!(json.contains("\"name\":\"demo\""));
        assert!(json.contains("\"busy\":true"));
    }

    #[test]
    fn test_state_event_serialization() {
        let event = EnvironmentEvent::state("demo", RuntimeState::Started);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"state\""));
        assert!(json.contains("\"state\":\"started\""));
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscriber() {
        let bus = EnvironmentEventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(EnvironmentEvent::busy("demo", true));
        let event = rx.recv().await.unwrap();
        assert_eq!(event, EnvironmentEvent::busy("demo", true));
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let bus = EnvironmentEventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(EnvironmentEvent::busy("demo", false));
    }
}

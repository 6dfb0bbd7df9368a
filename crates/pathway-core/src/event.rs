use tokio::sync::broadcast;

use crate::types::JourneyEvent;

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: broadcast::Sender<JourneyEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: JourneyEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JourneyEvent> {
        self.tx.subscribe()
    }

    /// Receive only the events of one journey.
    pub fn subscribe_journey(&self, journey_id: impl Into<String>) -> JourneySubscription {
        JourneySubscription {
            journey_id: journey_id.into(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Receiver filtered to a single journey id.
pub struct JourneySubscription {
    journey_id: String,
    rx: broadcast::Receiver<JourneyEvent>,
}

impl JourneySubscription {
    pub fn journey_id(&self) -> &str {
        &self.journey_id
    }

    /// Next event for this journey. Events of other journeys are skipped.
    pub async fn recv(&mut self) -> Result<JourneyEvent, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if event.journey_id() == self.journey_id {
                return Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeStatus;

    fn status(journey_id: &str, node_id: &str) -> JourneyEvent {
        JourneyEvent::StatusChanged {
            journey_id: journey_id.into(),
            node_id: node_id.into(),
            status: NodeStatus::Active,
        }
    }

    #[tokio::test]
    async fn journey_subscription_skips_other_journeys() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe_journey("j-2");

        bus.publish(status("j-1", "a"));
        bus.publish(JourneyEvent::JourneySeeded {
            journey_id: "j-2".into(),
            nodes: 3,
        });
        bus.publish(status("j-1", "b"));
        bus.publish(status("j-2", "c"));

        assert!(matches!(
            sub.recv().await.unwrap(),
            JourneyEvent::JourneySeeded { nodes: 3, .. }
        ));
        assert!(matches!(
            sub.recv().await.unwrap(),
            JourneyEvent::StatusChanged { ref node_id, .. } if node_id == "c"
        ));
    }

    #[tokio::test]
    async fn closed_bus_ends_subscription() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe_journey("j-1");
        bus.publish(status("j-2", "a"));
        drop(bus);

        assert_eq!(
            sub.recv().await.unwrap_err(),
            broadcast::error::RecvError::Closed
        );
    }
}

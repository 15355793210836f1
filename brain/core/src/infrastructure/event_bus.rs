// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - Pub/Sub for brain and query events
//
// In-memory broadcast of registry and pipeline events to the CLI and any
// other observers. Events are lost when nobody is subscribed.

use crate::domain::events::{BrainLifecycleEvent, QueryEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Brain(BrainLifecycleEvent),
    Query(QueryEvent),
}

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is the number of events buffered before slow receivers lag.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_brain_event(&self, event: BrainLifecycleEvent) {
        self.publish(DomainEvent::Brain(event));
    }

    pub fn publish_query_event(&self, event: QueryEvent) {
        self.publish(DomainEvent::Query(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::brain::BrainRevision;
    use crate::domain::query::{PipelineStep, QueryId};
    use chrono::Utc;

    #[tokio::test]
    async fn test_brain_event_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish_brain_event(BrainLifecycleEvent::BrainRegistered {
            name: "pets".to_string(),
            revision: BrainRevision(1),
            neuron_count: 2,
            replaced: false,
            registered_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            DomainEvent::Brain(BrainLifecycleEvent::BrainRegistered { name, replaced, .. }) => {
                assert_eq!(name, "pets");
                assert!(!replaced);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_events_are_drained_in_order() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();
        let query_id = QueryId::new();

        event_bus.publish_query_event(QueryEvent::QueryReceived {
            query_id,
            brain_name: "pets".to_string(),
            query: "cats".to_string(),
            received_at: Utc::now(),
        });
        event_bus.publish_query_event(QueryEvent::QueryFailed {
            query_id,
            brain_name: "pets".to_string(),
            step: PipelineStep::Resolve,
            reason: "brain not found".to_string(),
            failed_at: Utc::now(),
        });

        assert!(matches!(receiver.try_recv(), Ok(DomainEvent::Query(QueryEvent::QueryReceived { .. }))));
        assert!(matches!(receiver.try_recv(), Ok(DomainEvent::Query(QueryEvent::QueryFailed { .. }))));
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_no_subscribers_does_not_fail() {
        let event_bus = EventBus::default();
        event_bus.publish_brain_event(BrainLifecycleEvent::BrainUnregistered {
            name: "gone".to_string(),
            unregistered_at: Utc::now(),
        });
        let mut receiver = event_bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }
}

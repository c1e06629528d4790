//! Publishes event batches to the bus.

use std::sync::Arc;

use super::EventBatch;
use crate::bus::MessageBus;
use crate::error::RelayError;

/// Producer-side entry point used by the domain service.
///
/// Call [`Self::publish`] only after the domain change the batch describes
/// has been committed; the publisher has no way to check this.
#[derive(Debug, Clone)]
pub struct MutationPublisher {
    bus: Arc<dyn MessageBus>,
    routing_key: String,
}

impl MutationPublisher {
    /// Creates a publisher sending on `routing_key`.
    #[must_use]
    pub fn new(bus: Arc<dyn MessageBus>, routing_key: impl Into<String>) -> Self {
        Self {
            bus,
            routing_key: routing_key.into(),
        }
    }

    /// Starts an empty batch for one causal event.
    #[must_use]
    pub fn batch(&self) -> EventBatch {
        EventBatch::new()
    }

    /// Sends every line of `batch`, in order, one bus message per line.
    ///
    /// Returns the number of messages sent.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Publish`] on the first transport failure,
    /// carrying the position of the failing line. Lines before it have
    /// already been sent; nothing is retried.
    pub async fn publish(&self, batch: EventBatch) -> Result<usize, RelayError> {
        let lines = batch.into_lines();
        for (index, line) in lines.iter().enumerate() {
            self.bus
                .publish(&self.routing_key, line)
                .await
                .map_err(|source| RelayError::Publish { index, source })?;
        }
        tracing::debug!(messages = lines.len(), routing_key = %self.routing_key, "published mutation batch");
        Ok(lines.len())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::{Serialize, Serializer};
    use uuid::Uuid;

    use super::*;
    use crate::bus::{BusError, BusTopology, InMemoryBus, QueueReceiver};
    use crate::publisher::{Actor, EntityRef, MutationKind, MutationSubject};

    #[derive(Serialize)]
    struct Entity {
        id: i64,
        workflow_id: i64,
        current_state_id: i64,
    }

    impl MutationSubject for Entity {
        fn object_kind(&self) -> &str {
            "ResponseWorkflowEntity"
        }

        fn entity_ref(&self) -> EntityRef {
            EntityRef::WorkflowEntity {
                workflow_id: self.workflow_id,
                entity_id: self.id,
            }
        }
    }

    #[derive(Serialize)]
    struct State {
        id: i64,
        workflow_id: i64,
    }

    impl MutationSubject for State {
        fn object_kind(&self) -> &str {
            "ResponseWorkflowState"
        }

        fn entity_ref(&self) -> EntityRef {
            EntityRef::WorkflowState {
                workflow_id: self.workflow_id,
                state_id: self.id,
            }
        }
    }

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("broken"))
        }
    }

    impl MutationSubject for Broken {
        fn object_kind(&self) -> &str {
            "Broken"
        }

        fn entity_ref(&self) -> EntityRef {
            EntityRef::WorkflowState {
                workflow_id: 1,
                state_id: 2,
            }
        }
    }

    /// Accepts `fail_at` messages, then refuses everything.
    #[derive(Debug)]
    struct FlakyBus {
        sent: AtomicUsize,
        fail_at: usize,
    }

    #[async_trait]
    impl MessageBus for FlakyBus {
        async fn publish(&self, _routing_key: &str, _body: &str) -> Result<(), BusError> {
            if self.sent.load(Ordering::SeqCst) >= self.fail_at {
                return Err(BusError::Transport("connection reset".to_string()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn consume(&self, queue: &str) -> Result<Box<dyn QueueReceiver>, BusError> {
            Err(BusError::UnknownQueue(queue.to_string()))
        }
    }

    fn setup() -> (MutationPublisher, Arc<InMemoryBus>, BusTopology) {
        let topology = BusTopology::default();
        let bus = Arc::new(InMemoryBus::new(&topology));
        let publisher = MutationPublisher::new(
            Arc::clone(&bus) as Arc<dyn MessageBus>,
            topology.routing_key.clone(),
        );
        (publisher, bus, topology)
    }

    #[tokio::test]
    async fn batch_of_three_shares_event_id() {
        let (publisher, bus, topology) = setup();
        let actor = Actor::new("c1", "u1");
        let event_id = Uuid::new_v4();

        // A state transition: the moved entity plus its from/to states.
        let entity = Entity {
            id: 9,
            workflow_id: 1,
            current_state_id: 3,
        };
        let from = State {
            id: 2,
            workflow_id: 1,
        };
        let to = State {
            id: 3,
            workflow_id: 1,
        };
        let mut batch = publisher.batch();
        assert!(batch.add(&entity, MutationKind::Update, &actor, event_id).is_ok());
        assert!(batch.add(&from, MutationKind::Update, &actor, event_id).is_ok());
        assert!(batch.add(&to, MutationKind::Update, &actor, event_id).is_ok());

        let sent = publisher.publish(batch).await;
        assert_eq!(sent.ok(), Some(3));

        let Ok(mut notify) = bus.consume(&topology.notify_queue).await else {
            panic!("notify queue should be consumable");
        };
        let mut key_sections = Vec::new();
        for _ in 0..3 {
            let Ok(Some(delivery)) = notify.next().await else {
                panic!("expected delivery");
            };
            let Some((keys, payload)) = delivery.body.split_once(' ') else {
                panic!("malformed line");
            };
            let json: serde_json::Value = serde_json::from_str(payload).unwrap_or_default();
            assert_eq!(json["eventId"], event_id.to_string());
            key_sections.push(keys.to_string());
        }
        assert_eq!(
            key_sections,
            vec![
                "c1;WORKFLOW:1;WORKFLOW_ENTITY:9".to_string(),
                "c1;WORKFLOW:1;WORKFLOW_STATE:2".to_string(),
                "c1;WORKFLOW:1;WORKFLOW_STATE:3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn serialization_failure_aborts_whole_batch() {
        let (publisher, bus, topology) = setup();
        let actor = Actor::new("c1", "u1");
        let event_id = Uuid::new_v4();

        let outcome = async {
            let mut batch = publisher.batch();
            let entity = Entity {
                id: 9,
                workflow_id: 1,
                current_state_id: 3,
            };
            batch.add(&entity, MutationKind::Update, &actor, event_id)?;
            batch.add(&Broken, MutationKind::Update, &actor, event_id)?;
            publisher.publish(batch).await
        }
        .await;
        assert!(matches!(outcome, Err(RelayError::Serialization(_))));

        // Nothing reached the bus: the next thing seen is a later marker.
        assert!(bus.publish(&topology.routing_key, "marker").await.is_ok());
        let Ok(mut notify) = bus.consume(&topology.notify_queue).await else {
            panic!("notify queue should be consumable");
        };
        let Ok(Some(delivery)) = notify.next().await else {
            panic!("expected marker");
        };
        assert_eq!(delivery.body, "marker");
    }

    #[tokio::test]
    async fn transport_failure_reports_position_without_retry() {
        let bus = Arc::new(FlakyBus {
            sent: AtomicUsize::new(0),
            fail_at: 1,
        });
        let publisher = MutationPublisher::new(
            Arc::clone(&bus) as Arc<dyn MessageBus>,
            "workflow.entities.mutations",
        );
        let actor = Actor::new("c1", "u1");
        let event_id = Uuid::new_v4();

        let mut batch = publisher.batch();
        for id in [1, 2, 3] {
            let state = State { id, workflow_id: 1 };
            assert!(batch.add(&state, MutationKind::Update, &actor, event_id).is_ok());
        }

        let result = publisher.publish(batch).await;
        let Err(RelayError::Publish { index, source }) = result else {
            panic!("expected publish error");
        };
        assert_eq!(index, 1);
        assert_eq!(source, BusError::Transport("connection reset".to_string()));
        assert_eq!(bus.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let (publisher, _bus, _topology) = setup();
        let sent = publisher.publish(publisher.batch()).await;
        assert_eq!(sent.ok(), Some(0));
    }
}

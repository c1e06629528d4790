//! In-process topic exchange.
//!
//! [`InMemoryBus`] routes each published message into one unbounded
//! [`tokio::sync::mpsc`] channel per bound queue. Messages published before
//! a queue's consumer attaches are buffered, like a declared queue on a
//! broker. Each queue has exactly one consumer.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Binding, BusError, BusTopology, Delivery, MessageBus, QueueReceiver, topic_matches};

/// Single-process message bus.
#[derive(Debug)]
pub struct InMemoryBus {
    exchange: String,
    bindings: Vec<Binding>,
    senders: HashMap<String, mpsc::UnboundedSender<String>>,
    receivers: Mutex<HashMap<String, mpsc::UnboundedReceiver<String>>>,
}

impl InMemoryBus {
    /// Declares every queue of `topology` and binds it to the exchange.
    #[must_use]
    pub fn new(topology: &BusTopology) -> Self {
        let bindings = topology.bindings();
        let mut senders = HashMap::with_capacity(bindings.len());
        let mut receivers = HashMap::with_capacity(bindings.len());
        for binding in &bindings {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(binding.queue.clone(), tx);
            receivers.insert(binding.queue.clone(), rx);
        }
        Self {
            exchange: topology.exchange.clone(),
            bindings,
            senders,
            receivers: Mutex::new(receivers),
        }
    }

    /// Name of the exchange this bus represents.
    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, routing_key: &str, body: &str) -> Result<(), BusError> {
        let mut routed = 0_usize;
        for binding in &self.bindings {
            if !topic_matches(&binding.pattern, routing_key) {
                continue;
            }
            let Some(sender) = self.senders.get(&binding.queue) else {
                continue;
            };
            if sender.send(body.to_string()).is_err() {
                tracing::debug!(queue = %binding.queue, "queue consumer gone, message dropped");
                continue;
            }
            routed += 1;
        }
        if routed == 0 {
            tracing::debug!(exchange = %self.exchange, routing_key, "message not routed to any queue");
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Box<dyn QueueReceiver>, BusError> {
        if !self.senders.contains_key(queue) {
            return Err(BusError::UnknownQueue(queue.to_string()));
        }
        let mut receivers = self
            .receivers
            .lock()
            .map_err(|_| BusError::Transport("receiver table poisoned".to_string()))?;
        let rx = receivers
            .remove(queue)
            .ok_or_else(|| BusError::QueueTaken(queue.to_string()))?;
        Ok(Box::new(InMemoryQueueReceiver { rx }))
    }
}

/// Consumer side of one in-memory queue.
#[derive(Debug)]
pub struct InMemoryQueueReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl QueueReceiver for InMemoryQueueReceiver {
    async fn next(&mut self) -> Result<Option<Delivery>, BusError> {
        Ok(self.rx.recv().await.map(|body| Delivery { body }))
    }

    async fn ack(&mut self, _delivery: &Delivery) -> Result<(), BusError> {
        Ok(())
    }
}

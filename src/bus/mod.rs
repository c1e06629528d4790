//! Message bus abstraction shared by the producer and the broker.
//!
//! Mutations are published to a topic exchange under one routing key; the
//! exchange copies each message into every queue whose binding pattern
//! matches. The broker consumes the notify queue and drains the register
//! queue. Delivery is at-least-once: consumers acknowledge after handling
//! and must tolerate duplicates.

pub mod memory;
pub mod redis_queue;
pub mod topology;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub use memory::InMemoryBus;
pub use redis_queue::RedisBus;
pub use topology::{Binding, BusTopology, topic_matches};

use crate::config::{BusBackend, RelayConfig};
use crate::error::RelayError;

/// Transport-level bus failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The underlying connection or command failed.
    #[error("bus transport failure: {0}")]
    Transport(String),

    /// No queue with this name is declared in the topology.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    /// The queue already has its single consumer.
    #[error("queue already consumed: {0}")]
    QueueTaken(String),
}

/// One message taken from a queue, pending acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Raw message body as published.
    pub body: String,
}

/// Producer- and consumer-facing bus operations.
#[async_trait]
pub trait MessageBus: Send + Sync + fmt::Debug {
    /// Publishes `body` to the exchange under `routing_key`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Transport`] if the message could not be handed
    /// to the bus. Nothing is retried.
    async fn publish(&self, routing_key: &str, body: &str) -> Result<(), BusError>;

    /// Opens the consumer side of `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownQueue`] for undeclared queues and
    /// [`BusError::Transport`] on connection failure.
    async fn consume(&self, queue: &str) -> Result<Box<dyn QueueReceiver>, BusError>;
}

/// Consumer handle for one queue.
#[async_trait]
pub trait QueueReceiver: Send + fmt::Debug {
    /// Waits for the next message. `Ok(None)` means the queue is closed for
    /// good.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Transport`] when the connection fails; the caller
    /// may retry.
    async fn next(&mut self) -> Result<Option<Delivery>, BusError>;

    /// Confirms that `delivery` has been handled.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Transport`] when the acknowledgement could not be
    /// recorded; the message may then be redelivered.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), BusError>;
}

/// Builds the bus adapter selected by `config`.
///
/// # Errors
///
/// Returns [`RelayError::Bus`] if the Redis URL is invalid.
pub fn from_config(config: &RelayConfig) -> Result<Arc<dyn MessageBus>, RelayError> {
    let bus: Arc<dyn MessageBus> = match config.bus_backend {
        BusBackend::Memory => Arc::new(InMemoryBus::new(&config.topology)),
        BusBackend::Redis => Arc::new(RedisBus::open(
            &config.redis_url,
            config.topology.clone(),
            config.bus_poll_timeout_secs,
        )?),
    };
    tracing::info!(backend = ?config.bus_backend, exchange = %config.topology.exchange, "message bus ready");
    Ok(bus)
}

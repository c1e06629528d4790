//! Table of live connections and their outbound channels.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::ConnectionId;
use crate::error::DeliveryError;

/// Outbound side of every live WebSocket connection.
///
/// Each connection owns a bounded channel drained by its writer task; the
/// table only ever enqueues, so callers never wait on socket I/O.
#[derive(Debug)]
pub struct ConnectionTable {
    senders: DashMap<ConnectionId, mpsc::Sender<String>>,
    capacity: usize,
}

impl ConnectionTable {
    /// Creates an empty table whose channels buffer `capacity` frames.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Registers a new connection, returning its id and the receiving end
    /// its writer task drains.
    #[must_use]
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders.insert(id, tx);
        (id, rx)
    }

    /// Drops the connection's sender, which ends its writer task once the
    /// buffered frames are written. Returns `false` if it was not present.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.senders.remove(&id).is_some()
    }

    /// Enqueues `frame` for `id` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::UnknownConnection`] if `id` is not
    /// registered, [`DeliveryError::Backpressure`] if its buffer is full,
    /// and [`DeliveryError::Closed`] if its writer task has exited.
    pub fn send(&self, id: ConnectionId, frame: String) -> Result<(), DeliveryError> {
        let Some(sender) = self.senders.get(&id) else {
            return Err(DeliveryError::UnknownConnection);
        };
        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backpressure,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.senders.contains_key(&id)
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

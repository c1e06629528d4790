//! Connection lifecycle and command dispatch.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{Command, ConnectionTable};
use crate::domain::{ConnectionId, SubscriptionRegistry};
use crate::keepalive::KeepaliveCoalescer;

/// Owns the per-connection side of the broker.
///
/// The hub never replies to commands: subscription changes are silent and
/// the only server-originated frames are payloads and pongs.
#[derive(Debug, Clone)]
pub struct ConnectionHub {
    connections: Arc<ConnectionTable>,
    registry: Arc<SubscriptionRegistry>,
    keepalive: Arc<KeepaliveCoalescer>,
}

impl ConnectionHub {
    /// Creates a hub over shared connection and subscription state.
    #[must_use]
    pub fn new(
        connections: Arc<ConnectionTable>,
        registry: Arc<SubscriptionRegistry>,
        keepalive: Arc<KeepaliveCoalescer>,
    ) -> Self {
        Self {
            connections,
            registry,
            keepalive,
        }
    }

    /// Registers a new connection with no subscriptions.
    ///
    /// Returns its id and the outbound frames its writer task must send.
    #[must_use]
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let (id, rx) = self.connections.register();
        tracing::info!(connection_id = %id, connections = self.connections.len(), "ws client connected");
        (id, rx)
    }

    /// Parses and applies one inbound text frame.
    pub fn handle_frame(&self, id: ConnectionId, frame: &str) {
        let command = Command::parse(frame);
        tracing::trace!(connection_id = %id, ?command, "ws command");
        self.dispatch(id, command);
    }

    /// Applies an already-parsed command.
    pub fn dispatch(&self, id: ConnectionId, command: Command) {
        match command {
            Command::Subscribe(topics) => {
                let added = self.registry.subscribe(id, topics);
                tracing::debug!(connection_id = %id, added, "subscribed");
            }
            Command::Unsubscribe(topic) => {
                let removed = self.registry.unsubscribe(id, &topic);
                tracing::debug!(connection_id = %id, %topic, removed, "unsubscribed");
            }
            Command::UnsubscribeAll => {
                let removed = self.registry.unsubscribe_all(id);
                tracing::debug!(connection_id = %id, removed, "unsubscribed from all topics");
            }
            Command::Ping => {
                self.keepalive.on_ping(id);
            }
            Command::Unknown => {}
        }
    }

    /// Tears down a connection: subscriptions first, then the outbound
    /// channel, so the router never resolves a connection it cannot find.
    pub fn disconnect(&self, id: ConnectionId) {
        let removed = self.registry.unsubscribe_all(id);
        self.connections.remove(id);
        tracing::info!(connection_id = %id, subscriptions = removed, "ws client disconnected");
    }

    /// Shared connection table.
    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionTable> {
        &self.connections
    }

    /// Shared subscription registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}

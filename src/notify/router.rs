//! Fan-out of notify lines to subscribed connections.

use std::sync::Arc;

use super::NotifyMessage;
use crate::domain::SubscriptionRegistry;
use crate::error::DeliveryError;
use crate::ws::ConnectionTable;

/// Delivers each notify payload once to every connection subscribed to any
/// of its keys.
#[derive(Debug, Clone)]
pub struct NotificationRouter {
    registry: Arc<SubscriptionRegistry>,
    connections: Arc<ConnectionTable>,
}

impl NotificationRouter {
    /// Creates a router over shared subscription and connection state.
    #[must_use]
    pub fn new(registry: Arc<SubscriptionRegistry>, connections: Arc<ConnectionTable>) -> Self {
        Self {
            registry,
            connections,
        }
    }

    /// Routes one raw notify line. Returns how many connections accepted
    /// the payload.
    ///
    /// Lines that decode to no keys are dropped. A connection that cannot
    /// take the frame is logged and skipped; one whose outbound buffer is
    /// full is also removed from the table, which closes its socket.
    pub fn route(&self, raw: &str) -> usize {
        let Some(message) = NotifyMessage::parse(raw) else {
            tracing::debug!(len = raw.len(), "dropping notify line without deliverable keys");
            return 0;
        };

        let targets = self.registry.resolve_any(&message.keys);
        let mut delivered = 0;
        for connection in targets {
            match self.connections.send(connection, message.payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Backpressure) => {
                    tracing::warn!(connection_id = %connection, "outbound buffer full, closing connection");
                    self.connections.remove(connection);
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection, error = %e, "notification not delivered");
                }
            }
        }
        tracing::debug!(tenant = message.tenant, keys = message.keys.len(), delivered, "routed notification");
        delivered
    }
}

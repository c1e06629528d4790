//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::SubscriptionRegistry;
use crate::keepalive::{FlushTimer, KeepaliveCoalescer, TokioClock};
use crate::notify::NotificationRouter;
use crate::ws::{ConnectionHub, ConnectionTable};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Connection lifecycle and command dispatch.
    pub hub: ConnectionHub,
    /// Fan-out of notify lines; driven by the notify consumer.
    pub router: Arc<NotificationRouter>,
}

impl AppState {
    /// Wires one registry and one connection table into the hub, the
    /// keepalive coalescer and the notification router.
    #[must_use]
    pub fn new(pong_delay: Duration, outbound_channel_capacity: usize) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let connections = Arc::new(ConnectionTable::new(outbound_channel_capacity));
        let keepalive = Arc::new(KeepaliveCoalescer::new(
            FlushTimer::new(pong_delay),
            Arc::clone(&connections),
            Arc::new(TokioClock),
        ));
        let router = Arc::new(NotificationRouter::new(
            Arc::clone(&registry),
            Arc::clone(&connections),
        ));
        let hub = ConnectionHub::new(connections, registry, keepalive);
        Self { hub, router }
    }
}

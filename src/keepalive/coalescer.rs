//! Batched `pong` replies to client keepalive pings.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashSet;
use tokio::time::Instant;

use super::{Clock, FlushTimer};
use crate::domain::ConnectionId;
use crate::ws::ConnectionTable;

/// Frame sent in answer to a ping.
pub const PONG: &str = "pong";

/// A connection waiting for its `pong`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPong {
    /// Connection that pinged.
    pub connection: ConnectionId,
    /// When the ping was registered.
    pub enqueued_at: Instant,
}

/// Answers pings with at most one `pong` per connection per flush window.
///
/// A connection is "registered" from its first ping until the flush that
/// answers it; further pings in between are absorbed. Pending entries are
/// kept in arrival order, so a flush only has to pop from the front.
#[derive(Debug)]
pub struct KeepaliveCoalescer {
    registered: DashSet<ConnectionId>,
    pending: Mutex<VecDeque<PendingPong>>,
    timer: FlushTimer,
    connections: Arc<ConnectionTable>,
    clock: Arc<dyn Clock>,
}

impl KeepaliveCoalescer {
    /// Creates a coalescer that sends pongs through `connections`.
    #[must_use]
    pub fn new(timer: FlushTimer, connections: Arc<ConnectionTable>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registered: DashSet::new(),
            pending: Mutex::new(VecDeque::new()),
            timer,
            connections,
            clock,
        }
    }

    /// Registers a ping from `connection`.
    ///
    /// Returns `false` if the connection is already waiting for a pong.
    pub fn on_ping(self: &Arc<Self>, connection: ConnectionId) -> bool {
        if !self.registered.insert(connection) {
            return false;
        }
        let enqueued_at = self.clock.now();
        self.pending_queue().push_back(PendingPong {
            connection,
            enqueued_at,
        });

        let this = Arc::clone(self);
        if self.timer.arm(async move {
            this.flush();
        }) {
            tracing::trace!(delay = ?self.timer.delay(), "pong flush armed");
        }
        true
    }

    /// Sends one `pong` to every connection registered at or before now.
    ///
    /// Returns the number of pongs handed to the connection table.
    pub fn flush(&self) -> usize {
        let now = self.clock.now();
        let due: Vec<PendingPong> = {
            let mut pending = self.pending_queue();
            let mut due = Vec::new();
            while let Some(front) = pending.front() {
                if front.enqueued_at > now {
                    break;
                }
                if let Some(entry) = pending.pop_front() {
                    due.push(entry);
                }
            }
            due
        };

        let mut sent = 0;
        for entry in due {
            self.registered.remove(&entry.connection);
            match self.connections.send(entry.connection, PONG.to_string()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::debug!(connection_id = %entry.connection, error = %e, "pong not delivered");
                }
            }
        }
        sent
    }

    /// Number of connections waiting for a pong.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending_queue().len()
    }

    fn pending_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingPong>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::keepalive::TokioClock;

    const DELAY: Duration = Duration::from_secs(10);

    fn setup() -> (Arc<KeepaliveCoalescer>, Arc<ConnectionTable>) {
        let connections = Arc::new(ConnectionTable::new(16));
        let coalescer = Arc::new(KeepaliveCoalescer::new(
            FlushTimer::new(DELAY),
            Arc::clone(&connections),
            Arc::new(TokioClock),
        ));
        (coalescer, connections)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Clock that reads whatever instant the test last set.
    #[derive(Debug)]
    struct SetClock {
        now: Mutex<Instant>,
    }

    impl SetClock {
        fn set(&self, at: Instant) {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
        }
    }

    impl Clock for SetClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn five_pings_in_one_window_get_one_pong() {
        let (coalescer, connections) = setup();
        let (id, mut rx) = connections.register();

        assert!(coalescer.on_ping(id));
        for _ in 0..4 {
            assert!(!coalescer.on_ping(id));
        }
        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;

        assert_eq!(drain(&mut rx), vec![PONG.to_string()]);
        assert_eq!(coalescer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_windows_get_separate_pongs() {
        let (coalescer, connections) = setup();
        let (id, mut rx) = connections.register();

        assert!(coalescer.on_ping(id));
        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
        assert!(coalescer.on_ping(id));
        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;

        assert_eq!(drain(&mut rx), vec![PONG.to_string(), PONG.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_pong_before_delay() {
        let (coalescer, connections) = setup();
        let (id, mut rx) = connections.register();

        coalescer.on_ping(id);
        tokio::time::sleep(DELAY - Duration::from_secs(1)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn every_pinging_connection_is_answered() {
        let (coalescer, connections) = setup();
        let (a, mut rx_a) = connections.register();
        let (b, mut rx_b) = connections.register();

        coalescer.on_ping(a);
        tokio::time::sleep(Duration::from_secs(3)).await;
        coalescer.on_ping(b);
        tokio::time::sleep(DELAY).await;

        assert_eq!(drain(&mut rx_a), vec![PONG.to_string()]);
        assert_eq!(drain(&mut rx_b), vec![PONG.to_string()]);
    }

    #[tokio::test]
    async fn flush_leaves_entries_registered_after_now() {
        let origin = Instant::now();
        let connections = Arc::new(ConnectionTable::new(16));
        let clock = Arc::new(SetClock {
            now: Mutex::new(origin),
        });
        let coalescer = Arc::new(KeepaliveCoalescer::new(
            FlushTimer::new(Duration::from_secs(3600)),
            Arc::clone(&connections),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let (a, mut rx_a) = connections.register();
        let (b, mut rx_b) = connections.register();

        clock.set(origin + Duration::from_secs(1));
        coalescer.on_ping(a);
        clock.set(origin + Duration::from_secs(2));
        coalescer.on_ping(b);

        clock.set(origin + Duration::from_secs(1));
        assert_eq!(coalescer.flush(), 1);
        assert_eq!(drain(&mut rx_a), vec![PONG.to_string()]);
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(coalescer.pending_count(), 1);

        // `a` may ping again right away; `b` is still absorbed.
        assert!(coalescer.on_ping(a));
        assert!(!coalescer.on_ping(b));
    }

    #[tokio::test(start_paused = true)]
    async fn departed_connection_is_skipped() {
        let (coalescer, connections) = setup();
        let (id, rx) = connections.register();
        coalescer.on_ping(id);
        drop(rx);
        connections.remove(id);

        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
        assert_eq!(coalescer.pending_count(), 0);
        assert!(coalescer.on_ping(id));
    }
}

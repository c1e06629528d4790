//! Time source for keepalive bookkeeping.

use std::fmt::Debug;

use tokio::time::Instant;

/// Supplies the current instant.
pub trait Clock: Send + Sync + Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by the tokio runtime, so it follows a paused test clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

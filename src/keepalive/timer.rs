//! Single-flight delayed task.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Runs at most one delayed task at a time.
///
/// [`FlushTimer::arm`] starts a timer only when none is pending. The armed
/// flag is cleared just before the task runs, so an `arm` racing with the
/// task always schedules a fresh timer instead of being lost.
#[derive(Debug, Clone)]
pub struct FlushTimer {
    delay: Duration,
    armed: Arc<AtomicBool>,
}

impl FlushTimer {
    /// Creates an idle timer firing `delay` after being armed.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Delay between arming and firing.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns `true` while a timer is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Schedules `task` to run after the delay unless a timer is already
    /// pending. Returns `true` if this call armed the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let armed = Arc::clone(&self.armed);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            armed.store(false, Ordering::Release);
            task.await;
        });
        true
    }
}

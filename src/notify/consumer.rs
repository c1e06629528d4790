//! Bus consumer loops.

use std::sync::Arc;
use std::time::Duration;

use super::NotificationRouter;
use crate::bus::{Delivery, QueueReceiver};

/// Pause after a failed receive before trying again.
pub const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Consumes the notify queue, routing and acknowledging every line.
///
/// Receive errors are logged and retried after [`RECEIVE_BACKOFF`]. Returns
/// when the queue is closed.
pub async fn run_notify_consumer(mut receiver: Box<dyn QueueReceiver>, router: Arc<NotificationRouter>) {
    tracing::info!("notify consumer started");
    consume(receiver.as_mut(), |delivery| {
        router.route(&delivery.body);
    })
    .await;
    tracing::info!("notify consumer stopped");
}

/// Consumes the register queue and discards its lines.
///
/// The queue is bound so that register traffic does not pile up; nothing is
/// done with it yet.
pub async fn run_register_sink(mut receiver: Box<dyn QueueReceiver>) {
    tracing::info!("register sink started");
    consume(receiver.as_mut(), |delivery| {
        tracing::trace!(len = delivery.body.len(), "register line discarded");
    })
    .await;
    tracing::info!("register sink stopped");
}

async fn consume<F>(receiver: &mut dyn QueueReceiver, mut handle: F)
where
    F: FnMut(&Delivery),
{
    loop {
        let delivery = match receiver.next().await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "bus receive failed; backing off");
                tokio::time::sleep(RECEIVE_BACKOFF).await;
                continue;
            }
        };
        handle(&delivery);
        if let Err(e) = receiver.ack(&delivery).await {
            tracing::warn!(error = %e, "bus ack failed; message may be redelivered");
        }
    }
}

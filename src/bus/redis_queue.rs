//! Redis-backed queues.
//!
//! Each declared queue is a Redis list. Publishing pushes the body onto
//! every queue bound to the routing key inside one `MULTI`/`EXEC`
//! pipeline, so either all bound queues receive the message or none do.
//!
//! Consumers move messages with `BLMOVE` into `<queue>:processing` and
//! remove them with `LREM` once acknowledged. When a consumer attaches,
//! anything left in the processing list by a crashed predecessor is moved
//! back onto the queue, which gives at-least-once delivery.

use std::fmt;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::OnceCell;

use super::{BusError, BusTopology, Delivery, MessageBus, QueueReceiver};

fn transport(err: redis::RedisError) -> BusError {
    BusError::Transport(err.to_string())
}

/// Processing list holding in-flight messages of `queue`.
#[must_use]
pub fn processing_list(queue: &str) -> String {
    format!("{queue}:processing")
}

/// Message bus over Redis lists.
pub struct RedisBus {
    client: redis::Client,
    topology: BusTopology,
    poll_timeout_secs: u64,
    publisher: OnceCell<MultiplexedConnection>,
}

impl fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBus")
            .field("topology", &self.topology)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl RedisBus {
    /// Creates a bus for the Redis server at `url`. No connection is made
    /// until the first publish or consume.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Transport`] if `url` is not a valid Redis URL.
    pub fn open(url: &str, topology: BusTopology, poll_timeout_secs: u64) -> Result<Self, BusError> {
        let client = redis::Client::open(url).map_err(transport)?;
        Ok(Self {
            client,
            topology,
            poll_timeout_secs: poll_timeout_secs.max(1),
            publisher: OnceCell::new(),
        })
    }

    async fn publisher(&self) -> Result<MultiplexedConnection, BusError> {
        self.publisher
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(transport)
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn publish(&self, routing_key: &str, body: &str) -> Result<(), BusError> {
        let queues = self.topology.queues_for(routing_key);
        if queues.is_empty() {
            tracing::debug!(exchange = %self.topology.exchange, routing_key, "message not routed to any queue");
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for queue in &queues {
            pipe.lpush(queue, body).ignore();
        }

        let mut conn = self.publisher().await?;
        let _: () = pipe.query_async(&mut conn).await.map_err(transport)?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Box<dyn QueueReceiver>, BusError> {
        if !self.topology.declares(queue) {
            return Err(BusError::UnknownQueue(queue.to_string()));
        }

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport)?;
        let processing = processing_list(queue);

        let mut requeued = 0_usize;
        loop {
            let moved: Option<String> = redis::cmd("LMOVE")
                .arg(&processing)
                .arg(queue)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut connection)
                .await
                .map_err(transport)?;
            if moved.is_none() {
                break;
            }
            requeued += 1;
        }
        if requeued > 0 {
            tracing::info!(queue, requeued, "requeued unacknowledged messages");
        }

        Ok(Box::new(RedisQueueReceiver {
            connection,
            queue: queue.to_string(),
            processing,
            timeout_secs: self.poll_timeout_secs,
        }))
    }
}

/// Consumer side of one Redis list queue.
pub struct RedisQueueReceiver {
    connection: MultiplexedConnection,
    queue: String,
    processing: String,
    timeout_secs: u64,
}

impl fmt::Debug for RedisQueueReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueueReceiver")
            .field("queue", &self.queue)
            .field("processing", &self.processing)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QueueReceiver for RedisQueueReceiver {
    async fn next(&mut self) -> Result<Option<Delivery>, BusError> {
        loop {
            let moved: Option<String> = redis::cmd("BLMOVE")
                .arg(&self.queue)
                .arg(&self.processing)
                .arg("RIGHT")
                .arg("LEFT")
                .arg(self.timeout_secs)
                .query_async(&mut self.connection)
                .await
                .map_err(transport)?;
            if let Some(body) = moved {
                return Ok(Some(Delivery { body }));
            }
        }
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), BusError> {
        let _: i64 = redis::cmd("LREM")
            .arg(&self.processing)
            .arg(1)
            .arg(&delivery.body)
            .query_async(&mut self.connection)
            .await
            .map_err(transport)?;
        Ok(())
    }
}

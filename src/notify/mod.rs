//! Broker side of the bus: decoding notify lines and fanning them out.

pub mod consumer;
pub mod router;
pub mod wire;

pub use consumer::{RECEIVE_BACKOFF, run_notify_consumer, run_register_sink};
pub use router::NotificationRouter;
pub use wire::NotifyMessage;

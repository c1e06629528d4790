//! Producer side: mutation envelopes, event batches and the publisher.
//!
//! A request that changes domain state builds one [`EventBatch`] for the
//! change, adds every affected object under a shared event id, and hands
//! the batch to [`MutationPublisher::publish`] once the change is durable.

pub mod batch;
pub mod message;
pub mod mutation_publisher;

pub use batch::{EventBatch, KEY_SEPARATOR, PAYLOAD_SEPARATOR};
pub use message::{
    Actor, EntityRef, MutationKind, MutationMessage, MutationSubject, ReferenceKind,
};
pub use mutation_publisher::MutationPublisher;

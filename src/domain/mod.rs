//! Domain layer: identifiers, topic keys and the subscription index.
//!
//! The [`SubscriptionRegistry`] is the only shared mutable subscription
//! state of the broker. It is constructed once and injected into the
//! connection hub and the notification router.

pub mod connection_id;
pub mod subscription_registry;
pub mod topic_key;

pub use connection_id::ConnectionId;
pub use subscription_registry::SubscriptionRegistry;
pub use topic_key::TopicKey;

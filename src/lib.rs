//! # mutation-relay
//!
//! Mutation event batcher and WebSocket notification broker for the
//! workflow manager.
//!
//! The producer half ([`publisher`]) turns domain-object changes that share
//! one causal event into keyed wire lines and publishes them to a message
//! bus. The broker half consumes those lines and fans the payloads out to
//! every WebSocket connection subscribed to one of the derived topic keys.
//!
//! ## Architecture
//!
//! ```text
//! Domain service
//!     │
//!     ├── MutationPublisher / EventBatch (publisher/)
//!     │
//!     └── MessageBus: exchange → register queue, notify queue (bus/)
//!                                                   │
//!                                NotificationRouter (notify/)
//!                                                   │
//!            SubscriptionRegistry (domain/) ── ConnectionTable (ws/)
//!                                                   │
//!     WS clients ── ConnectionHub (ws/) ── KeepaliveCoalescer (keepalive/)
//! ```

pub mod api;
pub mod app_state;
pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod keepalive;
pub mod notify;
pub mod publisher;
pub mod system;
pub mod ws;

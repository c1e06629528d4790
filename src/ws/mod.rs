//! WebSocket layer: connection table, command protocol, hub and socket loop.
//!
//! Clients talk plain text frames (`S k1;k2`, `D key`, `D D`, `ping`). The
//! server sends raw notification payloads and `pong`, nothing else.

pub mod connection;
pub mod connections;
pub mod handler;
pub mod hub;
pub mod protocol;

pub use connections::ConnectionTable;
pub use hub::ConnectionHub;
pub use protocol::Command;

//! Relay error types.
//!
//! [`RelayError`] is the central error type surfaced to callers of the
//! producer API and to the process entry point. The streaming protocol has
//! no error channel, so broker-side failures only ever reach the logs.

use crate::bus::BusError;

/// Crate-wide error enum.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A mutation envelope could not be encoded as JSON.
    #[error("failed to serialize mutation: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A tenant id or key fragment would corrupt the wire line.
    #[error("invalid key section: {0}")]
    InvalidKeySection(String),

    /// The bus rejected or failed to accept a batch line.
    #[error("failed to publish message {index} of batch: {source}")]
    Publish {
        /// Zero-based position of the failing line within the batch.
        index: usize,
        /// Underlying transport error.
        #[source]
        source: BusError,
    },

    /// Bus setup or consumption failure outside of a publish call.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RelayError {
    /// Returns `true` for errors raised before anything reached the bus.
    #[must_use]
    pub const fn is_encoding(&self) -> bool {
        matches!(self, Self::Serialization(_) | Self::InvalidKeySection(_))
    }
}

/// Failure to hand a frame to one connection's outbound channel.
///
/// Always isolated to that connection; fan-out continues with the others.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The connection is not (or no longer) in the connection table.
    #[error("connection not found")]
    UnknownConnection,

    /// The connection's writer task has gone away.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound buffer is full; the frame was dropped.
    #[error("outbound buffer full")]
    Backpressure,
}

//! Keepalive: coalesced `pong` replies to client pings.
//!
//! Clients ping often; the broker answers each pinging connection once per
//! flush window rather than once per ping. [`FlushTimer`] provides the
//! single-flight delayed flush, [`KeepaliveCoalescer`] the bookkeeping.

pub mod clock;
pub mod coalescer;
pub mod timer;

pub use clock::{Clock, TokioClock};
pub use coalescer::{KeepaliveCoalescer, PONG, PendingPong};
pub use timer::FlushTimer;

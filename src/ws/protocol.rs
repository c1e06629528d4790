//! Inbound text-frame commands.
//!
//! | Frame       | Command          |
//! |-------------|------------------|
//! | `S k1;k2`   | subscribe        |
//! | `D key`     | unsubscribe      |
//! | `D D`       | unsubscribe all  |
//! | `ping`      | keepalive ping   |
//!
//! Anything else parses to [`Command::Unknown`] and is ignored by the hub.

use crate::domain::TopicKey;
use crate::publisher::KEY_SEPARATOR;

const PING: &str = "ping";
const SUBSCRIBE: &str = "S";
const UNSUBSCRIBE: &str = "D";

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Subscribe to every listed key. Empty keys are already dropped.
    Subscribe(Vec<TopicKey>),
    /// Unsubscribe from one key.
    Unsubscribe(TopicKey),
    /// Unsubscribe from every key the connection holds.
    UnsubscribeAll,
    /// Keepalive ping; answered by a coalesced `pong`.
    Ping,
    /// Not a recognised command.
    Unknown,
}

impl Command {
    /// Parses one text frame. Never fails: malformed frames are
    /// [`Command::Unknown`].
    ///
    /// Trailing spaces are ignored, except after `ping`, which must match
    /// exactly.
    #[must_use]
    pub fn parse(frame: &str) -> Self {
        if frame == PING {
            return Self::Ping;
        }

        let mut tokens = frame.trim_end_matches(' ').split(' ');
        let (Some(verb), Some(arg), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Self::Unknown;
        };

        match (verb, arg) {
            (UNSUBSCRIBE, UNSUBSCRIBE) => Self::UnsubscribeAll,
            (UNSUBSCRIBE, key) if !key.is_empty() => Self::Unsubscribe(TopicKey::from(key)),
            (SUBSCRIBE, keys) => Self::Subscribe(
                keys.split(KEY_SEPARATOR)
                    .filter(|key| !key.is_empty())
                    .map(TopicKey::from)
                    .collect(),
            ),
            _ => Self::Unknown,
        }
    }
}

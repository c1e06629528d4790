//! Bidirectional subscription index shared by the hub and the router.
//!
//! [`SubscriptionRegistry`] keeps `topic → {connection}` for fan-out and
//! `connection → {topic}` for disconnect cleanup. Both maps are
//! [`DashMap`]s, so there is no global lock: readers and writers only
//! contend on the shard holding the key they touch.
//!
//! # Consistency
//!
//! `C ∈ forward[T] ⇔ T ∈ inverse[C]`. Every mutation first takes the
//! connection's entry in `inverse` and only then touches `forward`, so
//! operations on the same connection are serialized and the lock order is
//! the same everywhere. Empty sets are pruned from both maps.

use std::collections::HashSet;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{ConnectionId, TopicKey};

/// Concurrent topic ↔ connection index.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    forward: DashMap<TopicKey, HashSet<ConnectionId>>,
    inverse: DashMap<ConnectionId, HashSet<TopicKey>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `connection` to every topic in `topics`.
    ///
    /// Topics the connection already holds are skipped. Returns how many
    /// subscriptions were actually added.
    pub fn subscribe<I>(&self, connection: ConnectionId, topics: I) -> usize
    where
        I: IntoIterator<Item = TopicKey>,
    {
        let mut held = self.inverse.entry(connection).or_default();
        let mut added = 0;
        for topic in topics {
            if held.contains(&topic) {
                continue;
            }
            self.forward
                .entry(topic.clone())
                .or_default()
                .insert(connection);
            held.insert(topic);
            added += 1;
        }
        let empty = held.is_empty();
        drop(held);
        if empty {
            self.inverse.remove_if(&connection, |_, topics| topics.is_empty());
        }
        added
    }

    /// Removes one `(connection, topic)` pair. Returns `false` if it was not
    /// present.
    pub fn unsubscribe(&self, connection: ConnectionId, topic: &TopicKey) -> bool {
        let Some(mut held) = self.inverse.get_mut(&connection) else {
            return false;
        };
        if !held.remove(topic) {
            return false;
        }
        self.detach(topic, connection);
        let empty = held.is_empty();
        drop(held);
        if empty {
            self.inverse.remove_if(&connection, |_, topics| topics.is_empty());
        }
        true
    }

    /// Removes every subscription held by `connection`.
    ///
    /// The inverse entry is the authoritative list of what to remove. Safe
    /// to call more than once; later calls return 0.
    pub fn unsubscribe_all(&self, connection: ConnectionId) -> usize {
        match self.inverse.entry(connection) {
            Entry::Occupied(held) => {
                for topic in held.get() {
                    self.detach(topic, connection);
                }
                held.remove().len()
            }
            Entry::Vacant(_) => 0,
        }
    }

    /// Returns a snapshot of the connections subscribed to `topic`.
    ///
    /// The returned set is owned; the registry may change while the caller
    /// iterates it.
    #[must_use]
    pub fn resolve(&self, topic: &str) -> HashSet<ConnectionId> {
        self.forward
            .get(topic)
            .map(|subscribers| subscribers.value().clone())
            .unwrap_or_default()
    }

    /// Returns the union of [`Self::resolve`] over `topics`.
    #[must_use]
    pub fn resolve_any<'a, I>(&self, topics: I) -> HashSet<ConnectionId>
    where
        I: IntoIterator<Item = &'a TopicKey>,
    {
        let mut connections = HashSet::new();
        for topic in topics {
            if let Some(subscribers) = self.forward.get(topic.as_str()) {
                connections.extend(subscribers.value().iter().copied());
            }
        }
        connections
    }

    /// Returns a snapshot of the topics `connection` is subscribed to.
    #[must_use]
    pub fn topics_of(&self, connection: ConnectionId) -> HashSet<TopicKey> {
        self.inverse
            .get(&connection)
            .map(|topics| topics.value().clone())
            .unwrap_or_default()
    }

    /// Number of topics with at least one subscriber.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.forward.len()
    }

    /// Number of connections holding at least one subscription.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inverse.len()
    }

    /// Total number of `(connection, topic)` pairs.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inverse.iter().map(|entry| entry.value().len()).sum()
    }

    fn detach(&self, topic: &TopicKey, connection: ConnectionId) {
        let now_empty = match self.forward.get_mut(topic.as_str()) {
            Some(mut subscribers) => {
                subscribers.remove(&connection);
                subscribers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.forward
                .remove_if(topic.as_str(), |_, subscribers| subscribers.is_empty());
        }
    }
}

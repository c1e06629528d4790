//! Subscription topic keys.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between the tenant id and an entity-reference fragment.
pub const TENANT_SEPARATOR: char = ':';

/// Tenant-scoped key naming one domain entity, e.g. `c1:WORKFLOW:42`.
///
/// Opaque to the broker: two keys match only when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicKey(String);

impl TopicKey {
    /// Wraps an already-formed key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Joins a tenant id and a reference fragment into `<tenant>:<fragment>`.
    ///
    /// This is the only rule the broker uses to turn a notify line's key
    /// section into subscribable keys; the producer's fragments are built to
    /// match it.
    #[must_use]
    pub fn join(tenant: &str, fragment: &str) -> Self {
        let mut key = String::with_capacity(tenant.len() + fragment.len() + 1);
        key.push_str(tenant);
        key.push(TENANT_SEPARATOR);
        key.push_str(fragment);
        Self(key)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopicKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for TopicKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for TopicKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

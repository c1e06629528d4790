//! Decoding of notify-queue lines.

use crate::domain::TopicKey;
use crate::publisher::{KEY_SEPARATOR, PAYLOAD_SEPARATOR};

/// One decoded notify line: the keys it targets and the payload to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyMessage<'a> {
    /// Tenant id, the first token of the key section.
    pub tenant: &'a str,
    /// Full topic keys, `<tenant>:<fragment>`, in line order.
    pub keys: Vec<TopicKey>,
    /// Everything after the first space, untouched.
    pub payload: &'a str,
}

impl<'a> NotifyMessage<'a> {
    /// Decodes `<tenant>;<fragment>;... <payload>`.
    ///
    /// Returns `None` when the line has no separating space, an empty
    /// tenant, or no non-empty fragment.
    #[must_use]
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (key_section, payload) = raw.split_once(PAYLOAD_SEPARATOR)?;
        let mut parts = key_section.split(KEY_SEPARATOR);
        let tenant = parts.next().filter(|tenant| !tenant.is_empty())?;
        let keys: Vec<TopicKey> = parts
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| TopicKey::join(tenant, fragment))
            .collect();
        if keys.is_empty() {
            return None;
        }
        Some(Self {
            tenant,
            keys,
            payload,
        })
    }
}

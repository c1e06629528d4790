//! Per-event accumulator of wire lines.

use uuid::Uuid;

use super::message::{Actor, MutationKind, MutationMessage, MutationSubject};
use crate::error::RelayError;

/// Separates the tenant and the fragments of a key section.
pub const KEY_SEPARATOR: char = ';';

/// Separates the key section from the envelope.
pub const PAYLOAD_SEPARATOR: char = ' ';

/// Wire lines produced by one causal event, in insertion order.
///
/// Owned by the request that builds it and consumed by
/// [`super::MutationPublisher::publish`].
#[derive(Debug, Default)]
pub struct EventBatch {
    lines: Vec<String>,
}

impl EventBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `object` and appends its wire line.
    ///
    /// The batch is left untouched when this fails.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Serialization`] if the envelope cannot be
    /// encoded, or [`RelayError::InvalidKeySection`] if the tenant id or a
    /// fragment contains a wire separator.
    pub fn add<T: MutationSubject>(
        &mut self,
        object: &T,
        mutation_kind: MutationKind,
        actor: &Actor,
        event_id: Uuid,
    ) -> Result<(), RelayError> {
        let entity = object.entity_ref();
        let fragments = entity.fragments();
        let key_section = key_section(&actor.tenant_id, &fragments)?;

        let message = MutationMessage {
            object,
            object_kind: object.object_kind(),
            mutation_kind,
            reference_kind: entity.reference_kind(),
            base_entity_id: entity.base_entity_id(),
            tenant_id: &actor.tenant_id,
            user_id: &actor.user_id,
            event_id,
        };
        let payload = serde_json::to_string(&message)?;

        self.lines
            .push(format!("{key_section}{PAYLOAD_SEPARATOR}{payload}"));
        Ok(())
    }

    /// Number of lines in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The encoded lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consumes the batch, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

fn key_section(tenant: &str, fragments: &[String]) -> Result<String, RelayError> {
    let invalid = |part: &str| {
        part.is_empty() || part.contains(KEY_SEPARATOR) || part.contains(char::is_whitespace)
    };
    if invalid(tenant) {
        return Err(RelayError::InvalidKeySection(format!("tenant id {tenant:?}")));
    }
    if let Some(bad) = fragments.iter().find(|fragment| invalid(fragment.as_str())) {
        return Err(RelayError::InvalidKeySection(format!("fragment {bad:?}")));
    }

    let mut section = tenant.to_string();
    for fragment in fragments {
        section.push(KEY_SEPARATOR);
        section.push_str(fragment);
    }
    Ok(section)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde::{Serialize, Serializer};

    use super::*;
    use crate::publisher::message::EntityRef;

    #[derive(Serialize)]
    struct State {
        id: i64,
        workflow_id: i64,
    }

    impl MutationSubject for State {
        fn object_kind(&self) -> &str {
            "ResponseWorkflowState"
        }

        fn entity_ref(&self) -> EntityRef {
            EntityRef::WorkflowState {
                workflow_id: self.workflow_id,
                state_id: self.id,
            }
        }
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refused"))
        }
    }

    impl MutationSubject for Unencodable {
        fn object_kind(&self) -> &str {
            "Unencodable"
        }

        fn entity_ref(&self) -> EntityRef {
            EntityRef::Workflow { workflow_id: 1 }
        }
    }

    #[test]
    fn line_is_key_section_space_payload() {
        let mut batch = EventBatch::new();
        let actor = Actor::new("c1", "u1");
        let state = State {
            id: 7,
            workflow_id: 1,
        };
        assert!(batch
            .add(&state, MutationKind::Update, &actor, Uuid::nil())
            .is_ok());

        let Some(line) = batch.lines().first() else {
            panic!("one line expected");
        };
        let Some((keys, payload)) = line.split_once(PAYLOAD_SEPARATOR) else {
            panic!("separator expected");
        };
        assert_eq!(keys, "c1;WORKFLOW:1;WORKFLOW_STATE:7");
        let json: serde_json::Value = serde_json::from_str(payload).unwrap_or_default();
        assert_eq!(json["obj"]["id"], 7);
        assert_eq!(json["baseEntityId"], 7);
    }

    #[test]
    fn serialization_failure_leaves_batch_unchanged() {
        let mut batch = EventBatch::new();
        let actor = Actor::new("c1", "u1");
        let state = State {
            id: 7,
            workflow_id: 1,
        };
        assert!(batch
            .add(&state, MutationKind::Update, &actor, Uuid::nil())
            .is_ok());

        let result = batch.add(&Unencodable, MutationKind::Update, &actor, Uuid::nil());
        assert!(matches!(result, Err(RelayError::Serialization(_))));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn tenant_with_separator_is_rejected() {
        let mut batch = EventBatch::new();
        let state = State {
            id: 7,
            workflow_id: 1,
        };
        for tenant in ["c 1", "c;1", ""] {
            let actor = Actor::new(tenant, "u1");
            let result = batch.add(&state, MutationKind::Update, &actor, Uuid::nil());
            assert!(matches!(result, Err(RelayError::InvalidKeySection(_))));
        }
        assert!(batch.is_empty());
    }
}

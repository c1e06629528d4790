//! Mutation envelope and topic-key fragments.
//!
//! A wire line is `<tenant>;<fragment>;<fragment>... <envelope-json>`. The
//! broker turns every fragment into the subscribable key
//! `<tenant>:<fragment>`, so a fragment is always `<KIND>:<id>` optionally
//! followed by a further `:`-qualifier.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Kind of change carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    /// The object was created or changed; the payload is its new state.
    Update,
}

/// Kind of entity an object hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    /// A workflow.
    Workflow,
    /// A state inside a workflow.
    WorkflowState,
    /// An entity moving through a workflow's states.
    WorkflowEntity,
}

impl ReferenceKind {
    /// Wire spelling used inside key fragments.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workflow => "WORKFLOW",
            Self::WorkflowState => "WORKFLOW_STATE",
            Self::WorkflowEntity => "WORKFLOW_ENTITY",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a mutated object refers to; decides its topic-key fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    /// A workflow itself.
    Workflow {
        /// Workflow id.
        workflow_id: i64,
    },
    /// A state of a workflow.
    WorkflowState {
        /// Owning workflow id.
        workflow_id: i64,
        /// State id.
        state_id: i64,
    },
    /// An entity of a workflow.
    WorkflowEntity {
        /// Owning workflow id.
        workflow_id: i64,
        /// Entity id.
        entity_id: i64,
    },
    /// An attribute description, which belongs to a workflow.
    AttributeDescription {
        /// Owning workflow id.
        workflow_id: i64,
    },
    /// An attribute value attached to a workflow, state or entity.
    Attribute {
        /// Kind of the object owning the attribute.
        owner: ReferenceKind,
        /// Id of the owning object.
        base_entity_id: i64,
    },
}

impl EntityRef {
    /// Reference kind recorded in the envelope.
    #[must_use]
    pub const fn reference_kind(&self) -> ReferenceKind {
        match self {
            Self::Workflow { .. } | Self::AttributeDescription { .. } => ReferenceKind::Workflow,
            Self::WorkflowState { .. } => ReferenceKind::WorkflowState,
            Self::WorkflowEntity { .. } => ReferenceKind::WorkflowEntity,
            Self::Attribute { owner, .. } => *owner,
        }
    }

    /// Base entity id recorded in the envelope.
    #[must_use]
    pub const fn base_entity_id(&self) -> i64 {
        match self {
            Self::Workflow { workflow_id } | Self::AttributeDescription { workflow_id } => {
                *workflow_id
            }
            Self::WorkflowState { state_id, .. } => *state_id,
            Self::WorkflowEntity { entity_id, .. } => *entity_id,
            Self::Attribute { base_entity_id, .. } => *base_entity_id,
        }
    }

    /// Key fragments, without the tenant prefix.
    ///
    /// States and entities are also announced on their workflow's key so a
    /// board view subscribed to the workflow sees them move.
    #[must_use]
    pub fn fragments(&self) -> Vec<String> {
        let workflow = ReferenceKind::Workflow;
        match self {
            Self::Workflow { workflow_id } | Self::AttributeDescription { workflow_id } => {
                vec![format!("{workflow}:{workflow_id}")]
            }
            Self::WorkflowState {
                workflow_id,
                state_id,
            } => vec![
                format!("{workflow}:{workflow_id}"),
                format!("{}:{state_id}", ReferenceKind::WorkflowState),
            ],
            Self::WorkflowEntity {
                workflow_id,
                entity_id,
            } => vec![
                format!("{workflow}:{workflow_id}"),
                format!("{}:{entity_id}", ReferenceKind::WorkflowEntity),
            ],
            Self::Attribute {
                owner,
                base_entity_id,
            } => vec![format!("{owner}:{base_entity_id}:attr")],
        }
    }
}

/// A domain object that can be announced as a mutation.
///
/// Implemented by the domain service for the response objects it returns;
/// the serialized object becomes the envelope's `obj` field.
pub trait MutationSubject: Serialize {
    /// Object-kind tag recorded in the envelope (e.g. `"ResponseWorkflowState"`).
    fn object_kind(&self) -> &str;

    /// Entity the object refers to.
    fn entity_ref(&self) -> EntityRef;
}

/// Tenant and user on whose behalf a mutation happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Tenant (client) id; first token of every key section.
    pub tenant_id: String,
    /// Acting user id.
    pub user_id: String,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Envelope serialized after the key section of a wire line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationMessage<'a, T> {
    /// The mutated object.
    #[serde(rename = "obj")]
    pub object: &'a T,
    /// Object-kind tag.
    #[serde(rename = "objType")]
    pub object_kind: &'a str,
    /// Mutation kind.
    #[serde(rename = "msgType")]
    pub mutation_kind: MutationKind,
    /// Kind of the referenced entity.
    #[serde(rename = "refType")]
    pub reference_kind: ReferenceKind,
    /// Id of the referenced entity.
    pub base_entity_id: i64,
    /// Tenant id.
    #[serde(rename = "clientId")]
    pub tenant_id: &'a str,
    /// Acting user id.
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    /// Id shared by every message caused by one logical operation.
    pub event_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_has_single_symmetric_fragment() {
        let r = EntityRef::Workflow { workflow_id: 42 };
        assert_eq!(r.fragments(), vec!["WORKFLOW:42".to_string()]);
        assert_eq!(r.reference_kind(), ReferenceKind::Workflow);
        assert_eq!(r.base_entity_id(), 42);
    }

    #[test]
    fn state_is_announced_on_workflow_and_itself() {
        let r = EntityRef::WorkflowState {
            workflow_id: 1,
            state_id: 7,
        };
        assert_eq!(
            r.fragments(),
            vec!["WORKFLOW:1".to_string(), "WORKFLOW_STATE:7".to_string()]
        );
        assert_eq!(r.base_entity_id(), 7);
    }

    #[test]
    fn attribute_fragment_is_qualified() {
        let r = EntityRef::Attribute {
            owner: ReferenceKind::WorkflowEntity,
            base_entity_id: 5,
        };
        assert_eq!(r.fragments(), vec!["WORKFLOW_ENTITY:5:attr".to_string()]);
        assert_eq!(r.reference_kind(), ReferenceKind::WorkflowEntity);
    }

    #[test]
    fn attribute_description_belongs_to_workflow() {
        let r = EntityRef::AttributeDescription { workflow_id: 3 };
        assert_eq!(r.fragments(), vec!["WORKFLOW:3".to_string()]);
        assert_eq!(r.reference_kind(), ReferenceKind::Workflow);
    }

    #[test]
    fn envelope_uses_wire_field_names() {
        let object = serde_json::json!({"id": 7});
        let message = MutationMessage {
            object: &object,
            object_kind: "ResponseWorkflowState",
            mutation_kind: MutationKind::Update,
            reference_kind: ReferenceKind::WorkflowState,
            base_entity_id: 7,
            tenant_id: "c1",
            user_id: "u1",
            event_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&message).unwrap_or_default();
        assert_eq!(json["obj"]["id"], 7);
        assert_eq!(json["objType"], "ResponseWorkflowState");
        assert_eq!(json["msgType"], "UPDATE");
        assert_eq!(json["refType"], "WORKFLOW_STATE");
        assert_eq!(json["baseEntityId"], 7);
        assert_eq!(json["clientId"], "c1");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["eventId"], Uuid::nil().to_string());
    }
}

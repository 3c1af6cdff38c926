use thiserror::Error;

use crate::{EntityId, Location};

/// Structural failures. These propagate out of registration and out of
/// [`GridWorld::step`](crate::GridWorld::step); the caller decides whether the
/// run continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("entity {entity} cannot be placed at {location}: intraversable entity {occupant} is already there")]
    PlacementConflict {
        entity: EntityId,
        location: Location,
        occupant: EntityId,
    },
    #[error("entity {entity} cannot be placed at {location}: outside the grid")]
    OutOfGrid { entity: EntityId, location: Location },
    #[error("agent {agent} tried to remove mandatory property `{property}`")]
    PropertyRemoved { agent: EntityId, property: String },
    #[error("agent {agent} tried to change property `{property}`, which is not writable")]
    PropertyNotWritable { agent: EntityId, property: String },
    #[error("agent {agent} tried to add unknown property `{property}`")]
    UnknownProperty { agent: EntityId, property: String },
    #[error("agent {agent} wrote an invalid value to `{property}`: {reason}")]
    InvalidPropertyValue {
        agent: EntityId,
        property: String,
        reason: String,
    },
    #[error("agent {holder} cannot pick up {item}: {item} is already carrying it")]
    CarryCycle { holder: EntityId, item: EntityId },
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("entity {0} is not an agent")]
    NotAnAgent(EntityId),
}

impl WorldError {
    /// The entity the failure is about.
    pub fn entity(&self) -> EntityId {
        match self {
            WorldError::PlacementConflict { entity, .. } | WorldError::OutOfGrid { entity, .. } => {
                *entity
            }
            WorldError::PropertyRemoved { agent, .. }
            | WorldError::PropertyNotWritable { agent, .. }
            | WorldError::UnknownProperty { agent, .. }
            | WorldError::InvalidPropertyValue { agent, .. } => *agent,
            WorldError::CarryCycle { item, .. } => *item,
            WorldError::UnknownEntity(id) | WorldError::NotAnAgent(id) => *id,
        }
    }
}

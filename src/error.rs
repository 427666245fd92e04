//! Errors returned by world operations.
//!
//! All of these are recoverable at the call site:
//! the rejected operation has no effect on the world.

use crate::entity::{EntityId, SampleId, SceneId};
use crate::world::scene::SceneState;

/// An error from a world operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The entity ID does not refer to a live entity,
    /// either because the slot was reused or because the entity is being destroyed.
    #[error("entity {0:?} is stale or has been destroyed")]
    StaleEntity(EntityId),

    /// The entity already holds a component of the same type.
    #[error("entity {entity:?} already has a component of type {ty}")]
    DuplicateComponent {
        /// The entity.
        entity: EntityId,
        /// The component type name.
        ty:     &'static str,
    },

    /// The entity does not hold a component of the requested type.
    #[error("entity {entity:?} has no component of type {ty}")]
    MissingComponent {
        /// The entity.
        entity: EntityId,
        /// The component type name.
        ty:     &'static str,
    },

    /// `flush` was called during a flush, an update or a sample iteration.
    #[error("flush() cannot be called while a flush, update or iteration is in progress")]
    ReentrantFlush,

    /// `update` was called during an update or a flush.
    #[error("update() cannot be called while the world is updating or flushing")]
    ReentrantUpdate,

    /// The scene ID does not refer to a scene that accepts changes.
    #[error("scene {0:?} is stale or being destroyed")]
    StaleScene(SceneId),

    /// The scene state machine does not allow the transition.
    #[error("scene {scene:?} cannot transition from {from:?} to {to:?}")]
    InvalidSceneTransition {
        /// The scene.
        scene: SceneId,
        /// The current state.
        from:  SceneState,
        /// The requested state.
        to:    SceneState,
    },

    /// The sample ID has been released.
    #[error("sample {0:?} is stale or has been released")]
    StaleSample(SampleId),

    /// The ordering constraints of the registered systems form a cycle.
    #[error("systems have a cyclic order: {0}")]
    CyclicSystemOrder(String),

    /// A system with the same name is already registered.
    #[error("system {0:?} is already registered")]
    DuplicateSystem(String),

    /// Systems cannot be added or removed while they are running.
    #[error("systems cannot be added or removed during update()")]
    SystemsLocked,
}

/// Result type of world operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

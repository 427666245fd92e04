//! Typed events dispatched to subscribers with mutable access to the world.
//!
//! Subscribers are registered with [`World::subscribe`](crate::World::subscribe).
//! The world dispatches the core events in this module during flushes and scene transitions;
//! user-defined events are sent with [`World::broadcast`](crate::World::broadcast)
//! (queued until the next flush) or
//! [`World::broadcast_immediate`](crate::World::broadcast_immediate).

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::entity::{EntityId, SceneId};
use crate::util::{ObserverId, Observers};
use crate::world::scene::SceneState;
use crate::World;

/// An entity has joined the world at a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityAdded {
    /// The entity.
    pub entity: EntityId,
}

/// An entity is being freed at a flush.
///
/// Components of the entity can still be read by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRemoved {
    /// The entity.
    pub entity: EntityId,
}

/// The set of component types on an entity changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityComponentsChanged {
    /// The entity.
    pub entity: EntityId,
}

/// The active flag of an entity changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityActiveChanged {
    /// The entity.
    pub entity: EntityId,
    /// The new value of the flag.
    pub active: bool,
}

/// A scene has changed its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStateChanged {
    /// The scene.
    pub scene: SceneId,
    /// The new state.
    pub state: SceneState,
}

/// A handle to unsubscribe an event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: TypeId,
    id:    ObserverId,
}

pub(crate) type Handler = dyn FnMut(&mut World, &dyn Any);

/// Stores event handlers by event type.
#[derive(Default)]
pub(crate) struct Bus {
    handlers: HashMap<TypeId, Observers<Handler>>,
}

impl Bus {
    pub(crate) fn subscribe<E: 'static>(
        &mut self,
        mut handler: impl FnMut(&mut World, &E) + 'static,
    ) -> Subscription {
        let erased = move |world: &mut World, event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(world, event);
            }
        };

        let event = TypeId::of::<E>();
        let id = self.handlers.entry(event).or_default().subscribe(Rc::new(RefCell::new(erased)));
        Subscription { event, id }
    }

    pub(crate) fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        match self.handlers.get_mut(&subscription.event) {
            Some(observers) => observers.unsubscribe(subscription.id),
            None => false,
        }
    }

    pub(crate) fn handlers(&self, event: TypeId) -> Option<&Observers<Handler>> {
        self.handlers.get(&event).filter(|observers| !observers.is_empty())
    }
}

//! Components are the data attached to entities.
//!
//! Any `'static` type can be a component by implementing [`Component`],
//! usually through the [`comp`](crate::comp) attribute macro.
//! An entity holds at most one component of each concrete type.

use std::any::{Any, TypeId};

use indexmap::IndexSet;

use crate::entity::{EntityId, SceneId};
use crate::util::DbgTypeId;

/// A value attached to an entity.
///
/// The hooks are called by the world with the ID of the owning entity.
/// They cannot access the world directly;
/// use systems or event subscriptions for logic that spans entities.
pub trait Component: Any {
    /// Called at the first flush after the component is attached,
    /// before the entity is reevaluated by samples.
    fn awake(&mut self, _entity: EntityId) {}

    /// Called when the component is removed or its entity is destroyed.
    ///
    /// Only components that have been passed to [`Component::awake`] are destroyed.
    fn destroy(&mut self, _entity: EntityId) {}

    /// Called at flush when the active flag of the entity has changed.
    fn active_changed(&mut self, _entity: EntityId, _active: bool) {}

    /// Called when the entity is moved to another scene (or out of any scene).
    fn scene_changed(&mut self, _entity: EntityId, _scene: Option<SceneId>) {}

    /// Handles an event sent to the entity with [`World::send_event`](crate::World::send_event).
    ///
    /// Returns whether the event was handled.
    fn process_event(&mut self, _entity: EntityId, _event: &dyn Any) -> bool { false }
}

/// Object-safe downcasting of components.
pub(crate) trait AnyComponent: Component {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyComponent for T {
    fn as_any(&self) -> &dyn Any { self }

    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}

/// A component owned by an entity.
pub(crate) struct Slot {
    pub(crate) value:    Box<dyn AnyComponent>,
    /// Whether [`Component::awake`] has been called.
    pub(crate) awakened: bool,
    /// Whether the component is queued for removal at the next flush.
    pub(crate) removing: bool,
}

impl Slot {
    pub(crate) fn new(value: Box<dyn AnyComponent>) -> Self {
        Self { value, awakened: false, removing: false }
    }

    pub(crate) fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }

    pub(crate) fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.value.as_any_mut().downcast_mut()
    }
}

/// Assigns a dense bit index to each component type seen by a world.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    types: IndexSet<DbgTypeId>,
}

impl Registry {
    /// Returns the bit of the type, registering it if it is new.
    pub(crate) fn bit_of(&mut self, ty: DbgTypeId) -> usize { self.types.insert_full(ty).0 }

    /// Returns the bit of the type if it has been registered.
    pub(crate) fn get(&self, ty: &TypeId) -> Option<usize> { self.types.get_index_of(ty) }
}

#[cfg(test)]
mod tests {
    use std::any::TypeId;

    use super::{Component, Registry, Slot};
    use crate::entity::EntityId;
    use crate::util::DbgTypeId;

    struct Counter(u32);

    impl Component for Counter {
        fn awake(&mut self, _: EntityId) { self.0 += 1; }
    }

    struct Other;

    impl Component for Other {}

    #[test]
    fn test_slot_downcast() {
        let mut slot = Slot::new(Box::new(Counter(3)));
        slot.value.awake(EntityId::INVALID);

        assert_eq!(slot.downcast_ref::<Counter>().map(|c| c.0), Some(4));
        assert!(slot.downcast_ref::<Other>().is_none());

        slot.downcast_mut::<Counter>().expect("type matches").0 = 9;
        assert_eq!(slot.value.as_any().downcast_ref::<Counter>().map(|c| c.0), Some(9));
    }

    #[test]
    fn test_registry_bits_are_dense() {
        let mut registry = Registry::default();
        assert_eq!(registry.bit_of(DbgTypeId::of::<Counter>()), 0);
        assert_eq!(registry.bit_of(DbgTypeId::of::<Other>()), 1);
        assert_eq!(registry.bit_of(DbgTypeId::of::<Counter>()), 0, "bits are stable");

        assert_eq!(registry.get(&TypeId::of::<Other>()), Some(1));
        assert_eq!(registry.get(&TypeId::of::<u8>()), None);
    }
}

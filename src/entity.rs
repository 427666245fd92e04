//! Entities are the simulation objects of a world.
//!
//! An entity is identified by an [`EntityId`],
//! which packs the slot index of the entity with the generation of the slot.
//! The generation is bumped every time the slot is reused,
//! so an ID captured before the entity was destroyed never refers to a newer entity.
//!
//! Entities own an ordered set of [components](crate::comp),
//! at most one of each concrete type.

use std::any::TypeId;
use std::fmt;

use bitvec::vec::BitVec;
use indexmap::IndexMap;

use crate::comp::{self, Component};
use crate::util::DbgTypeId;

pub mod ealloc;
pub use ealloc::Ealloc;

pub mod generation;
pub use generation::{Generation, IdWithGeneration};

mod table;
pub(crate) use table::Table;

#[cfg(test)]
mod tests;

/// Tags [`IdWithGeneration`] as an entity ID.
pub enum EntityTag {}
/// Tags [`IdWithGeneration`] as a scene ID.
pub enum SceneTag {}
/// Tags [`IdWithGeneration`] as a sample ID.
pub enum SampleTag {}

/// Identifies an entity in a world.
pub type EntityId = IdWithGeneration<EntityTag>;
/// Identifies a scene in a world.
pub type SceneId = IdWithGeneration<SceneTag>;
/// Identifies a sample in a world.
pub type SampleId = IdWithGeneration<SampleTag>;

/// The lifecycle stage of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Created, but not flushed yet. Not visible to samples.
    Adding,
    /// Flushed and visible to samples.
    Live,
    /// Destroyed, to be freed at the next flush.
    Removing,
}

/// An object in the world.
pub struct Entity {
    id:                            EntityId,
    name:                          Option<String>,
    active:                        bool,
    scene:                         Option<SceneId>,
    lifecycle:                     Lifecycle,
    components:                    IndexMap<DbgTypeId, comp::Slot>,
    /// Bits of the component types currently attached, as assigned by [`comp::Registry`].
    mask:                          BitVec,
    /// Whether the entity has ever been [`Lifecycle::Live`].
    pub(crate) joined:             bool,
    /// Whether a components-changed operation is pending.
    pub(crate) components_changed: bool,
    /// The active flag last reported to component hooks.
    pub(crate) reported_active:    bool,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: Option<String>, scene: Option<SceneId>) -> Self {
        Self {
            id,
            name,
            active: true,
            scene,
            lifecycle: Lifecycle::Adding,
            components: IndexMap::new(),
            mask: BitVec::new(),
            joined: false,
            components_changed: false,
            reported_active: true,
        }
    }

    /// The ID of this entity.
    pub fn id(&self) -> EntityId { self.id }

    /// The name of this entity, if any.
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }

    /// Whether the entity is active.
    pub fn is_active(&self) -> bool { self.active }

    /// The scene owning this entity, if any.
    pub fn scene(&self) -> Option<SceneId> { self.scene }

    /// The lifecycle stage of the entity.
    pub fn lifecycle(&self) -> Lifecycle { self.lifecycle }

    /// Whether the entity has not been destroyed.
    pub fn is_alive(&self) -> bool { self.lifecycle != Lifecycle::Removing }

    /// Number of components on this entity.
    pub fn component_count(&self) -> usize { self.components.len() }

    /// Iterates over the component types on this entity in attachment order.
    pub fn component_types(&self) -> impl Iterator<Item = DbgTypeId> + '_ {
        self.components.keys().copied()
    }

    /// Whether the entity has a component of type `T`.
    pub fn has<T: Component>(&self) -> bool { self.has_type(&TypeId::of::<T>()) }

    /// Whether the entity has a component of the given type.
    pub fn has_type(&self, ty: &TypeId) -> bool { self.components.contains_key(ty) }

    /// Gets the component of type `T`.
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub(crate) fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) { self.lifecycle = lifecycle; }

    pub(crate) fn set_active(&mut self, active: bool) { self.active = active; }

    pub(crate) fn set_scene(&mut self, scene: Option<SceneId>) { self.scene = scene; }

    pub(crate) fn has_bit(&self, bit: usize) -> bool {
        self.mask.get(bit).map_or(false, |set| *set)
    }

    pub(crate) fn slot_mut(&mut self, ty: &TypeId) -> Option<&mut comp::Slot> {
        self.components.get_mut(ty)
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut comp::Slot> + '_ {
        self.components.values_mut()
    }

    /// Attaches a component. The caller must ensure the type is not already present.
    pub(crate) fn insert(&mut self, ty: DbgTypeId, bit: usize, slot: comp::Slot) -> &mut comp::Slot {
        if self.mask.len() <= bit {
            self.mask.resize(bit + 1, false);
        }
        self.mask.set(bit, true);

        let entry = match self.components.entry(ty) {
            indexmap::map::Entry::Vacant(entry) => entry,
            indexmap::map::Entry::Occupied(_) => panic!("component {ty} is already attached"),
        };
        entry.insert(slot)
    }

    /// Detaches a component.
    pub(crate) fn take(&mut self, ty: &TypeId, bit: Option<usize>) -> Option<comp::Slot> {
        let slot = self.components.shift_remove(ty)?;
        if let Some(bit) = bit {
            if bit < self.mask.len() {
                self.mask.set(bit, false);
            }
        }
        Some(slot)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("scene", &self.scene)
            .field("lifecycle", &self.lifecycle)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

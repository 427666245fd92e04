//! Samples are incrementally maintained views over the entities matching a [`Signature`].
//!
//! A sample is requested from the world with [`World::request_sample`](crate::World::request_sample).
//! Its membership is reevaluated whenever a flush changes the components,
//! the active flag or the lifecycle of an entity.
//! After every flush, the members of a sample are exactly
//! the live entities that have all the included component types
//! and none of the excluded component types.
//!
//! Iteration uses a [`Snapshot`] of the membership,
//! which is unaffected by the changes applied at later flushes.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use bitvec::vec::BitVec;
use indexmap::IndexSet;
use itertools::Itertools;

use crate::comp::{self, Component};
use crate::entity::{Entity, EntityId, Lifecycle, SampleId};
use crate::util::{DbgTypeId, ObserverId, Observers};
use crate::World;

#[cfg(test)]
mod tests;

/// The set of component types an entity must and must not have to be a member of a sample.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    include:     BTreeSet<DbgTypeId>,
    exclude:     BTreeSet<DbgTypeId>,
    active_only: bool,
}

impl Signature {
    /// A signature matching all live entities.
    pub fn new() -> Self { Self::default() }

    /// Requires entities to have a component of type `T`.
    pub fn with<T: Component>(self) -> Self { self.with_type(DbgTypeId::of::<T>()) }

    /// Requires entities to have a component of the given type.
    pub fn with_type(mut self, ty: DbgTypeId) -> Self {
        self.include.insert(ty);
        self
    }

    /// Requires entities not to have a component of type `T`.
    pub fn without<T: Component>(self) -> Self { self.without_type(DbgTypeId::of::<T>()) }

    /// Requires entities not to have a component of the given type.
    pub fn without_type(mut self, ty: DbgTypeId) -> Self {
        self.exclude.insert(ty);
        self
    }

    /// Only matches entities whose active flag is set.
    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// The required component types.
    pub fn includes(&self) -> impl Iterator<Item = DbgTypeId> + '_ { self.include.iter().copied() }

    /// The forbidden component types.
    pub fn excludes(&self) -> impl Iterator<Item = DbgTypeId> + '_ { self.exclude.iter().copied() }

    /// Whether inactive entities are filtered out.
    pub fn is_active_only(&self) -> bool { self.active_only }

    /// Tests an entity against this signature by looking up each component type.
    ///
    /// Samples use a precompiled bit filter instead,
    /// but the result is always the same.
    pub fn matches(&self, entity: &Entity) -> bool {
        entity.lifecycle() == Lifecycle::Live
            && (!self.active_only || entity.is_active())
            && self.include.iter().all(|ty| entity.has_type(&ty.id))
            && !self.exclude.iter().any(|ty| entity.has_type(&ty.id))
    }

    pub(crate) fn compile(&self, registry: &mut comp::Registry) -> Filter {
        let mut include = BitVec::new();
        let mut exclude = BitVec::new();

        for (types, bits) in [(&self.include, &mut include), (&self.exclude, &mut exclude)] {
            for &ty in types {
                let bit = registry.bit_of(ty);
                if bits.len() <= bit {
                    bits.resize(bit + 1, false);
                }
                bits.set(bit, true);
            }
        }

        Filter { include, exclude, active_only: self.active_only }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Signature(with [{}]", self.include.iter().join(", "))?;
        if !self.exclude.is_empty() {
            write!(f, ", without [{}]", self.exclude.iter().join(", "))?;
        }
        if self.active_only {
            write!(f, ", active only")?;
        }
        write!(f, ")")
    }
}

/// A [`Signature`] compiled against the bits of a [`comp::Registry`].
pub(crate) struct Filter {
    include:     BitVec,
    exclude:     BitVec,
    active_only: bool,
}

impl Filter {
    pub(crate) fn matches(&self, entity: &Entity) -> bool {
        entity.lifecycle() == Lifecycle::Live
            && (!self.active_only || entity.is_active())
            && self.include.iter_ones().all(|bit| entity.has_bit(bit))
            && !self.exclude.iter_ones().any(|bit| entity.has_bit(bit))
    }
}

/// A change of sample membership, passed to sample observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEvent {
    /// The entity started matching the sample.
    Inserted(EntityId),
    /// The entity no longer matches the sample.
    Removed(EntityId),
}

pub(crate) type Observer = dyn FnMut(&mut World, SampleEvent);

/// A handle to stop observing a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleObserver {
    pub(crate) sample: SampleId,
    pub(crate) id:     ObserverId,
}

impl SampleObserver {
    /// The observed sample.
    pub fn sample(&self) -> SampleId { self.sample }
}

/// A filtered view over the entities of a world.
pub struct Sample {
    id:                   SampleId,
    signature:            Signature,
    filter:               Filter,
    members:              Rc<IndexSet<EntityId>>,
    pub(crate) ref_count: usize,
    pub(crate) observers: Observers<Observer>,
}

impl Sample {
    pub(crate) fn new(
        id: SampleId,
        signature: Signature,
        filter: Filter,
        members: IndexSet<EntityId>,
    ) -> Self {
        Self {
            id,
            signature,
            filter,
            members: Rc::new(members),
            ref_count: 1,
            observers: Observers::default(),
        }
    }

    /// The ID of this sample.
    pub fn id(&self) -> SampleId { self.id }

    /// The signature of this sample.
    pub fn signature(&self) -> &Signature { &self.signature }

    /// Number of members.
    pub fn len(&self) -> usize { self.members.len() }

    /// Whether the sample has no members.
    pub fn is_empty(&self) -> bool { self.members.is_empty() }

    /// Whether the entity is a member.
    pub fn contains(&self, entity: EntityId) -> bool { self.members.contains(&entity) }

    /// Iterates over the members in the order they joined the sample.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ { self.members.iter().copied() }

    /// Takes a snapshot of the current members.
    ///
    /// This does not copy the members until the sample changes.
    pub fn snapshot(&self) -> Snapshot { Snapshot { members: Rc::clone(&self.members) } }

    /// Reevaluates the membership of an entity.
    ///
    /// Returns the membership change, if any.
    /// Calling this again without changing the entity returns `None`.
    pub fn process_entity(&mut self, entity: &Entity) -> Option<SampleEvent> {
        let id = entity.id();
        let matches = self.filter.matches(entity);

        match (matches, self.members.contains(&id)) {
            (true, false) => {
                Rc::make_mut(&mut self.members).insert(id);
                Some(SampleEvent::Inserted(id))
            }
            (false, true) => {
                Rc::make_mut(&mut self.members).shift_remove(&id);
                Some(SampleEvent::Removed(id))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Sample")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("members", &self.members)
            .finish()
    }
}

/// An immutable copy of the members of a sample at some point.
#[derive(Clone, Default)]
pub struct Snapshot {
    members: Rc<IndexSet<EntityId>>,
}

impl Snapshot {
    /// Number of members.
    pub fn len(&self) -> usize { self.members.len() }

    /// Whether the snapshot has no members.
    pub fn is_empty(&self) -> bool { self.members.is_empty() }

    /// Whether the entity was a member when the snapshot was taken.
    pub fn contains(&self, entity: EntityId) -> bool { self.members.contains(&entity) }

    /// Iterates over the members.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ { self.members.iter().copied() }
}

impl<'t> IntoIterator for &'t Snapshot {
    type Item = EntityId;
    type IntoIter = std::iter::Copied<indexmap::set::Iter<'t, EntityId>>;

    fn into_iter(self) -> Self::IntoIter { self.members.iter().copied() }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.members.iter()).finish()
    }
}

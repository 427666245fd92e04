use std::marker::PhantomData;

use super::ealloc::{Ealloc, RecyclePolicy};
use super::generation::{self, Generation, IdWithGeneration};

/// Slot storage addressed by generational IDs.
///
/// Removed slots are only reused after [`flush`](Self::flush).
/// A slot removed at [`Generation::MAX`] is retired and never reused,
/// so a stale ID can never match a later occupant.
pub(crate) struct Table<Tag, T> {
    ealloc:      Box<dyn Ealloc>,
    generations: generation::Store,
    slots:       Vec<Option<T>>,
    /// Number of slots retired with an exhausted generation.
    retired:     usize,
    _ph:         PhantomData<fn() -> Tag>,
}

impl<Tag, T> Table<Tag, T> {
    pub(crate) fn new(policy: RecyclePolicy) -> Self {
        Self {
            ealloc:      policy.build(),
            generations: generation::Store::default(),
            slots:       Vec::new(),
            retired:     0,
            _ph:         PhantomData,
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
        self.generations.reserve(additional);
    }

    /// Allocates a slot and fills it with the value constructed from the new ID.
    pub(crate) fn insert_with(
        &mut self,
        value: impl FnOnce(IdWithGeneration<Tag>) -> T,
    ) -> IdWithGeneration<Tag> {
        let index = self.ealloc.allocate();
        let id = IdWithGeneration::pack(index, self.generations.next(index));

        let offset = index as usize;
        if self.slots.len() <= offset {
            self.slots.resize_with(offset + 1, || None);
        }
        let slot = self.slots.get_mut(offset).expect("just resized");
        debug_assert!(slot.is_none(), "ealloc allocated an occupied slot");
        *slot = Some(value(id));

        id
    }

    fn is_current(&self, id: IdWithGeneration<Tag>) -> bool {
        let (index, generation) = id.unpack();
        id.is_valid() && self.generations.get(index) == generation
    }

    pub(crate) fn get(&self, id: IdWithGeneration<Tag>) -> Option<&T> {
        if !self.is_current(id) {
            return None;
        }
        self.slots.get(id.index() as usize)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: IdWithGeneration<Tag>) -> Option<&mut T> {
        if !self.is_current(id) {
            return None;
        }
        self.slots.get_mut(id.index() as usize)?.as_mut()
    }

    pub(crate) fn contains(&self, id: IdWithGeneration<Tag>) -> bool { self.get(id).is_some() }

    /// Empties the slot and queues its index for reuse after the next flush.
    pub(crate) fn remove(&mut self, id: IdWithGeneration<Tag>) -> Option<T> {
        if !self.is_current(id) {
            return None;
        }
        let value = self.slots.get_mut(id.index() as usize)?.take()?;

        if id.generation().is_exhausted() {
            log::debug!("Retiring slot {} after {} allocations", id.index(), Generation::MAX.get());
            self.retired += 1;
        } else {
            self.ealloc.queue_deallocate(id.index());
        }

        Some(value)
    }

    pub(crate) fn flush(&mut self) { self.ealloc.flush(); }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize { self.ealloc.allocated() - self.retired }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (IdWithGeneration<Tag>, &T)> + '_ {
        let generations = &self.generations;
        self.slots.iter().enumerate().filter_map(move |(offset, slot)| {
            let value = slot.as_ref()?;
            let index = offset as u32;
            Some((IdWithGeneration::pack(index, generations.get(index)), value))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (IdWithGeneration<Tag>, &mut T)> + '_ {
        let generations = &self.generations;
        self.slots.iter_mut().enumerate().filter_map(move |(offset, slot)| {
            let value = slot.as_mut()?;
            let index = offset as u32;
            Some((IdWithGeneration::pack(index, generations.get(index)), value))
        })
    }
}

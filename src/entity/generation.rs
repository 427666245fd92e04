//! Tracks the number of times a slot index is allocated,
//! used for distinguishment of stale handles.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// The number of times the same slot has been used for allocation.
/// This type is fully ordered, where a greater generation implies newer version.
///
/// Generation 0 is never assigned to an allocated slot.
/// The counter never wraps: a slot that reaches [`Generation::MAX`] is retired by its table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub(crate) u16);

impl Generation {
    /// The last generation a slot can be allocated with.
    pub const MAX: Self = Self(u16::MAX);

    /// The raw counter value.
    pub fn get(self) -> u16 { self.0 }

    /// Whether the slot can no longer be reallocated.
    pub fn is_exhausted(self) -> bool { self == Self::MAX }

    fn bump(&mut self) {
        self.0 = self.0.checked_add(1).expect("exhausted slots must not be reallocated");
    }
}

/// Stores generations of all slots in a table.
#[derive(Debug, Default)]
pub struct Store {
    vec: Vec<Generation>,
}

impl Store {
    /// Bumps the generation of the slot.
    pub fn next(&mut self, index: u32) -> Generation {
        let index = index as usize;
        if self.vec.len() <= index {
            self.vec.resize(index + 1, Generation::default());
        }

        let generation = self.vec.get_mut(index).expect("just resized");
        generation.bump();
        *generation
    }

    /// Gets the generation of the last allocation at `index`.
    pub fn get(&self, index: u32) -> Generation {
        self.vec.get(index as usize).copied().unwrap_or_default()
    }

    /// Reserves capacity for at least `additional` more slots.
    pub fn reserve(&mut self, additional: usize) { self.vec.reserve(additional) }
}

/// A handle to a slot in a table, packed with the generation of the slot
/// at the time the handle was created.
///
/// `Tag` only distinguishes handles of different tables at the type level.
pub struct IdWithGeneration<Tag> {
    index:      u32,
    generation: Generation,
    _ph:        PhantomData<fn() -> Tag>,
}

impl<Tag> IdWithGeneration<Tag> {
    /// The sentinel handle that never refers to any slot.
    pub const INVALID: Self = Self { index: u32::MAX, generation: Generation(0), _ph: PhantomData };

    /// Packs an index and a generation into a handle.
    pub const fn pack(index: u32, generation: Generation) -> Self {
        Self { index, generation, _ph: PhantomData }
    }

    /// Unpacks the handle into its index and generation.
    pub const fn unpack(self) -> (u32, Generation) { (self.index, self.generation) }

    /// The slot index.
    pub const fn index(self) -> u32 { self.index }

    /// The slot generation.
    pub const fn generation(self) -> Generation { self.generation }

    /// Whether this handle is not the [`INVALID`](Self::INVALID) sentinel.
    ///
    /// A valid handle may still be stale;
    /// staleness can only be checked against the table.
    pub fn is_valid(self) -> bool { self != Self::INVALID }

    /// Converts the handle into a single integer, with the index in the high bits.
    pub const fn to_bits(self) -> u64 { ((self.index as u64) << 16) | self.generation.0 as u64 }

    /// Inverse of [`to_bits`](Self::to_bits).
    /// Bits above the lowest 48 are ignored.
    pub const fn from_bits(bits: u64) -> Self {
        Self::pack((bits >> 16) as u32, Generation(bits as u16))
    }
}

impl<Tag> Clone for IdWithGeneration<Tag> {
    fn clone(&self) -> Self { *self }
}

impl<Tag> Copy for IdWithGeneration<Tag> {}

impl<Tag> PartialEq for IdWithGeneration<Tag> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<Tag> Eq for IdWithGeneration<Tag> {}

impl<Tag> PartialOrd for IdWithGeneration<Tag> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl<Tag> Ord for IdWithGeneration<Tag> {
    fn cmp(&self, other: &Self) -> Ordering { self.to_bits().cmp(&other.to_bits()) }
}

impl<Tag> Hash for IdWithGeneration<Tag> {
    fn hash<H: Hasher>(&self, state: &mut H) { self.to_bits().hash(state) }
}

impl<Tag> Default for IdWithGeneration<Tag> {
    fn default() -> Self { Self::INVALID }
}

impl<Tag> fmt::Debug for IdWithGeneration<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}v{}", self.index, self.generation.0)
        } else {
            f.write_str("INVALID")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Generation, IdWithGeneration, Store};

    type Id = IdWithGeneration<()>;

    #[test]
    fn test_pack_unpack() {
        let id = Id::pack(7, Generation(3));
        assert_eq!(id.unpack(), (7, Generation(3)));
        assert_eq!(Id::from_bits(id.to_bits()), id);
        assert!(id.is_valid());
        assert_ne!(id, Id::pack(7, Generation(4)), "same index, different generation");
    }

    #[test]
    fn test_invalid_sentinel() {
        assert_eq!(Id::INVALID.unpack(), (u32::MAX, Generation(0)));
        assert!(!Id::INVALID.is_valid());
        assert_eq!(Id::default(), Id::INVALID);
        assert_eq!(format!("{:?}", Id::INVALID), "INVALID");
    }

    #[test]
    fn test_store_counts_from_one() {
        let mut store = Store::default();
        assert_eq!(store.get(3), Generation(0), "unallocated slots have generation 0");

        assert_eq!(store.next(3), Generation(1), "generation 0 is reserved for unallocated slots");
        assert_eq!(store.next(3), Generation(2));
        assert_eq!(store.get(2), Generation(0));
        assert!(!store.get(3).is_exhausted());

        store.vec[3] = Generation(u16::MAX - 1);
        assert_eq!(store.next(3), Generation::MAX);
        assert!(store.get(3).is_exhausted());
    }

    #[test]
    #[should_panic(expected = "exhausted slots must not be reallocated")]
    fn test_exhausted_generation_does_not_wrap() {
        let mut store = Store::default();
        store.vec.push(Generation::MAX);
        store.next(0);
    }
}

//! Manages slot index allocation and deallocation.

use std::collections::BTreeSet;

mod recycler;
pub use recycler::Recycler;


/// Manages slot index allocation and deallocation.
///
/// Deallocated indices are only reused after [`flush`](Ealloc::flush),
/// so that a slot freed during a flush cannot be handed out by the same flush.
pub trait Ealloc: 'static {
    /// Allocates an index, either recycled or fresh.
    fn allocate(&mut self) -> u32;

    /// Queues the deallocation of an index.
    fn queue_deallocate(&mut self, index: u32);

    /// Makes the queued indices available for allocation.
    fn flush(&mut self);

    /// Number of indices currently allocated.
    fn allocated(&self) -> usize;
}

/// Selects the order in which freed indices are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecyclePolicy {
    /// Reuse the lowest freed index first, keeping the table compact.
    #[default]
    LowestFirst,
    /// Reuse the most recently freed index first.
    MostRecent,
}

impl RecyclePolicy {
    pub(crate) fn build(self) -> Box<dyn Ealloc> {
        match self {
            Self::LowestFirst => Box::<Recycling<BTreeSet<u32>>>::default(),
            Self::MostRecent => Box::<Recycling<Vec<u32>>>::default(),
        }
    }
}

/// The default allocator, which allocates new indices from a gauge
/// and reuses freed indices through a [`Recycler`].
#[derive(Debug, Default)]
pub struct Recycling<R: Recycler> {
    /// The next fresh index.
    gauge:         u32,
    /// Indices available for reuse.
    recycler:      R,
    /// Indices freed since the last flush.
    dealloc_queue: Vec<u32>,
}

impl<R: Recycler> Ealloc for Recycling<R> {
    fn allocate(&mut self) -> u32 {
        if let Some(index) = self.recycler.poll() {
            return index;
        }

        let index = self.gauge;
        assert!(index < u32::MAX, "slot index space exhausted");
        self.gauge += 1;
        index
    }

    fn queue_deallocate(&mut self, index: u32) {
        debug_assert!(index < self.gauge, "deallocating an index that was never allocated");
        self.dealloc_queue.push(index);
    }

    fn flush(&mut self) { self.recycler.extend(self.dealloc_queue.drain(..)); }

    fn allocated(&self) -> usize {
        self.gauge as usize - self.recycler.len() - self.dealloc_queue.len()
    }
}

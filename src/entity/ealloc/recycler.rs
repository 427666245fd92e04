use std::collections::BTreeSet;

/// A data structure that provides the ability to recycle slot indices.
pub trait Recycler: Default + Extend<u32> + 'static {
    /// Returns the length of this recycler.
    fn len(&self) -> usize;

    /// Returns whether the recycler is empty.
    fn is_empty(&self) -> bool { self.len() == 0 }

    /// Polls an index from the recycler.
    fn poll(&mut self) -> Option<u32>;
}

/// A minimal recycler implemented through a FILO stack.
impl Recycler for Vec<u32> {
    fn len(&self) -> usize { Vec::len(self) }

    fn poll(&mut self) -> Option<u32> { self.pop() }
}

/// Always recycles the lowest free index.
impl Recycler for BTreeSet<u32> {
    fn len(&self) -> usize { BTreeSet::len(self) }

    fn poll(&mut self) -> Option<u32> { self.pop_first() }
}

//! Miscellaneous utilities.

use std::any::{self, TypeId};
use std::borrow::Borrow;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A [`TypeId`] that remembers the name of its type.
///
/// Equality, ordering and hashing only consider the [`TypeId`],
/// so maps keyed by `DbgTypeId` can be queried with a plain `TypeId`.
#[derive(Clone, Copy)]
pub struct DbgTypeId {
    /// The type ID.
    pub id:   TypeId,
    /// The type name, only used for diagnostics.
    pub name: &'static str,
}

impl DbgTypeId {
    /// Creates a `DbgTypeId` of the given type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self { id: TypeId::of::<T>(), name: any::type_name::<T>() }
    }
}

impl PartialEq for DbgTypeId {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for DbgTypeId {}

impl PartialOrd for DbgTypeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for DbgTypeId {
    fn cmp(&self, other: &Self) -> Ordering { self.id.cmp(&other.id) }
}

impl Hash for DbgTypeId {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state) }
}

impl Borrow<TypeId> for DbgTypeId {
    fn borrow(&self) -> &TypeId { &self.id }
}

impl fmt::Debug for DbgTypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name) }
}

impl fmt::Display for DbgTypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name) }
}

/// Identifies a callback in an [`Observers`] list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// A list of callbacks that may be modified while being dispatched.
pub struct Observers<F: ?Sized> {
    next_id: u64,
    entries: Vec<(ObserverId, Rc<RefCell<F>>)>,
}

impl<F: ?Sized> Default for Observers<F> {
    fn default() -> Self { Self { next_id: 0, entries: Vec::new() } }
}

impl<F: ?Sized> Observers<F> {
    /// Appends a callback to the list.
    pub fn subscribe(&mut self, callback: Rc<RefCell<F>>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Removes a callback from the list.
    /// Returns `false` if the callback was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        match self.entries.iter().position(|&(entry, _)| entry == id) {
            Some(position) => {
                self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    /// Whether the callback is still subscribed.
    pub fn contains(&self, id: ObserverId) -> bool {
        self.entries.iter().any(|&(entry, _)| entry == id)
    }

    /// Number of subscribed callbacks.
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether no callbacks are subscribed.
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Copies the current list for dispatching.
    pub fn snapshot(&self) -> Vec<(ObserverId, Rc<RefCell<F>>)> {
        self.entries.iter().map(|(id, callback)| (*id, Rc::clone(callback))).collect()
    }
}

/// Calls each callback in the list resolved by `list` with mutable access to `ctx`.
///
/// The list is snapshotted before the first call.
/// Callbacks unsubscribed by an earlier callback in the same dispatch are skipped,
/// and callbacks subscribed during the dispatch are only called in later dispatches.
/// A callback that is already running further up the stack is not called again.
pub(crate) fn dispatch<C, F: ?Sized>(
    ctx: &mut C,
    list: impl Fn(&C) -> Option<&Observers<F>>,
    mut call: impl FnMut(&mut F, &mut C),
) {
    let snapshot = match list(ctx) {
        Some(observers) => observers.snapshot(),
        None => return,
    };

    for (id, callback) in snapshot {
        if !list(ctx).map_or(false, |observers| observers.contains(id)) {
            continue;
        }

        match callback.try_borrow_mut() {
            Ok(mut callback) => call(&mut *callback, ctx),
            Err(_) => log::warn!("Observer {id:?} is already running, skipping nested dispatch"),
        }
    }
}

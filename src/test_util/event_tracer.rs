use parking_lot::Mutex;

use crate::entity::{EntityId, SampleId};
use crate::system::System;
use crate::world::Tracer;

/// An event recorded by [`EventTracer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    StartTick(u64),
    EndTick(u64),
    StartFlush { frame: u64, operations: usize },
    EndFlush { frame: u64 },
    StartSystem(String),
    EndSystem(String),
    Join(EntityId),
    Free(EntityId),
    SampleInsert(SampleId, EntityId),
    SampleRemove(SampleId, EntityId),
}

/// Records tracer events in the order they happen.
#[derive(Default)]
pub struct EventTracer {
    events: Mutex<Vec<Event>>,
}

impl EventTracer {
    fn record(&self, event: Event) {
        log::trace!("Trace {event:?}");
        self.events.lock().push(event);
    }

    /// Returns and clears the recorded events.
    pub fn take(&self) -> Vec<Event> { std::mem::take(&mut *self.events.lock()) }

    /// Names of the systems started so far, in order.
    pub fn systems(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::StartSystem(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Asserts that both events have been recorded and `before` happened first.
    ///
    /// # Panics
    /// Panics if either event is missing or the order is reversed.
    pub fn assert_order(&self, before: &Event, after: &Event) {
        let events = self.events.lock();
        let position = |event: &Event| {
            events
                .iter()
                .position(|recorded| recorded == event)
                .unwrap_or_else(|| panic!("{event:?} was not recorded in {events:?}"))
        };
        assert!(position(before) < position(after), "{after:?} should happen after {before:?}");
    }
}

impl Tracer for EventTracer {
    fn start_tick(&self, frame: u64) { self.record(Event::StartTick(frame)) }

    fn end_tick(&self, frame: u64) { self.record(Event::EndTick(frame)) }

    fn start_flush(&self, frame: u64, operations: usize) {
        self.record(Event::StartFlush { frame, operations })
    }

    fn end_flush(&self, frame: u64, _rerun: usize) { self.record(Event::EndFlush { frame }) }

    fn start_run_system(&self, _position: usize, name: &str, _system: &mut dyn System) {
        self.record(Event::StartSystem(name.to_string()))
    }

    fn end_run_system(&self, _position: usize, name: &str, _system: &mut dyn System) {
        self.record(Event::EndSystem(name.to_string()))
    }

    fn join_entity(&self, entity: EntityId) { self.record(Event::Join(entity)) }

    fn free_entity(&self, entity: EntityId) { self.record(Event::Free(entity)) }

    fn sample_insert(&self, sample: SampleId, entity: EntityId) {
        self.record(Event::SampleInsert(sample, entity))
    }

    fn sample_remove(&self, sample: SampleId, entity: EntityId) {
        self.record(Event::SampleRemove(sample, entity))
    }
}

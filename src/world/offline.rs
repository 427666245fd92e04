//! Operations queued to be executed at the next flush.

use std::any::Any;
use std::fmt;

use crate::entity::{EntityId, SceneId};
use crate::util::DbgTypeId;
use crate::world::{Tracer, World};

/// An operation to be executed at flush.
pub(crate) trait Operation: fmt::Debug {
    /// Performs the operation during flush.
    fn run(self: Box<Self>, world: &mut World, tracer: &dyn Tracer) -> OperationResult;
}

/// Result of an operation.
pub(crate) enum OperationResult {
    /// The operation completed.
    Ok,
    /// The operation should be rerun at the next flush.
    /// This should return self.
    QueueForRerun(Box<dyn Operation>),
}

/// Makes a created entity live.
#[derive(Debug)]
pub(crate) struct AddEntity {
    pub(crate) entity: EntityId,
}

impl Operation for AddEntity {
    fn run(self: Box<Self>, world: &mut World, tracer: &dyn Tracer) -> OperationResult {
        world.join_entity(self.entity, tracer);
        OperationResult::Ok
    }
}

/// Frees a destroyed entity.
#[derive(Debug)]
pub(crate) struct DestroyEntity {
    pub(crate) entity: EntityId,
}

impl Operation for DestroyEntity {
    fn run(self: Box<Self>, world: &mut World, tracer: &dyn Tracer) -> OperationResult {
        world.free_entity(self.entity, tracer);
        OperationResult::Ok
    }
}

/// Awakens new components and reevaluates samples.
#[derive(Debug)]
pub(crate) struct ComponentsChanged {
    pub(crate) entity: EntityId,
}

impl Operation for ComponentsChanged {
    fn run(self: Box<Self>, world: &mut World, tracer: &dyn Tracer) -> OperationResult {
        if world.apply_components_changed(self.entity, tracer) {
            OperationResult::Ok
        } else {
            OperationResult::QueueForRerun(self)
        }
    }
}

/// Detaches a component marked for removal.
#[derive(Debug)]
pub(crate) struct RemoveComponent {
    pub(crate) entity: EntityId,
    pub(crate) ty:     DbgTypeId,
}

impl Operation for RemoveComponent {
    fn run(self: Box<Self>, world: &mut World, tracer: &dyn Tracer) -> OperationResult {
        world.apply_remove_component(self.entity, self.ty.id, tracer);
        OperationResult::Ok
    }
}

/// Reports a change of the active flag.
#[derive(Debug)]
pub(crate) struct ActiveChanged {
    pub(crate) entity: EntityId,
}

impl Operation for ActiveChanged {
    fn run(self: Box<Self>, world: &mut World, tracer: &dyn Tracer) -> OperationResult {
        world.apply_active_changed(self.entity, tracer);
        OperationResult::Ok
    }
}

/// Dispatches an event to the subscribers of its type.
pub(crate) struct Broadcast {
    pub(crate) ty:    DbgTypeId,
    pub(crate) event: Box<dyn Any>,
}

impl fmt::Debug for Broadcast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Broadcast").field("ty", &self.ty).finish_non_exhaustive()
    }
}

impl Operation for Broadcast {
    fn run(self: Box<Self>, world: &mut World, _: &dyn Tracer) -> OperationResult {
        world.dispatch_any(self.ty.id, &*self.event);
        OperationResult::Ok
    }
}

/// Delivers an event to the components of an entity.
pub(crate) struct Unicast {
    pub(crate) entity: EntityId,
    pub(crate) ty:     DbgTypeId,
    pub(crate) event:  Box<dyn Any>,
}

impl fmt::Debug for Unicast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Unicast")
            .field("entity", &self.entity)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

impl Operation for Unicast {
    fn run(self: Box<Self>, world: &mut World, _: &dyn Tracer) -> OperationResult {
        world.deliver_event(self.entity, &*self.event);
        OperationResult::Ok
    }
}

/// Removes a destroyed scene once all its entities have been freed.
#[derive(Debug)]
pub(crate) struct DetachScene {
    pub(crate) scene: SceneId,
}

impl Operation for DetachScene {
    fn run(self: Box<Self>, world: &mut World, _: &dyn Tracer) -> OperationResult {
        if world.detach_scene(self.scene) {
            OperationResult::Ok
        } else {
            OperationResult::QueueForRerun(self)
        }
    }
}

/// Stores the queued operations.
#[derive(Default)]
pub(crate) struct Buffer {
    /// Queue of operations to rerun in the next flush.
    rerun_queue: Vec<Box<dyn Operation>>,
    /// Operations queued since the last flush, in FIFO order.
    items:       Vec<Box<dyn Operation>>,
}

impl Buffer {
    pub(crate) fn push(&mut self, op: impl Operation + 'static) {
        log::trace!("Queue {op:?}");
        self.items.push(Box::new(op));
    }

    pub(crate) fn queue_rerun(&mut self, op: Box<dyn Operation>) { self.rerun_queue.push(op); }

    /// Takes the operations to run in a flush.
    /// Operations queued while they run are kept for the next flush.
    pub(crate) fn take_cycle(&mut self) -> Vec<Box<dyn Operation>> {
        let mut ops = std::mem::take(&mut self.rerun_queue);
        ops.append(&mut self.items);
        ops
    }

    pub(crate) fn len(&self) -> usize { self.rerun_queue.len() + self.items.len() }

    /// Number of operations waiting for a rerun.
    pub(crate) fn rerun_len(&self) -> usize { self.rerun_queue.len() }
}

#![allow(missing_docs)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use parking_lot::Once;

use crate::entity::{EntityId, SceneId};
use crate::sample::Snapshot;
use crate::world::Builder;
use crate::{comp, system, World};

mod event_tracer;
pub use event_tracer::{Event, EventTracer};

pub fn init() {
    static SET_LOGGER_ONCE: Once = Once::new();
    SET_LOGGER_ONCE.call_once(env_logger::init);
}

/// Builds a world with no systems.
pub fn empty_world() -> World {
    init();
    Builder::new("test").build().expect("a world without systems always builds")
}

#[comp(ecsworld_as(crate))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position(pub i32, pub i32);

#[comp(ecsworld_as(crate))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Velocity(pub i32, pub i32);

#[comp(ecsworld_as(crate))]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Frozen;

#[comp(ecsworld_as(crate))]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Health(pub u32);

/// An event delivered with [`World::send_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping(pub i32);

/// A hook invocation observed by [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Awake(EntityId),
    Destroy(EntityId),
    ActiveChanged(EntityId, bool),
    SceneChanged(EntityId, Option<SceneId>),
    Ping(EntityId, i32),
}

pub type HookLog = Rc<RefCell<Vec<Hook>>>;

/// A component that records every hook called on it.
#[comp(
    ecsworld_as(crate),
    awake = Recorder::on_awake,
    destroy = Recorder::on_destroy,
    active_changed = Recorder::on_active_changed,
    scene_changed = Recorder::on_scene_changed,
    process_event = Recorder::on_event,
)]
pub struct Recorder(pub HookLog);

impl Recorder {
    fn on_awake(&mut self, entity: EntityId) { self.0.borrow_mut().push(Hook::Awake(entity)) }

    fn on_destroy(&mut self, entity: EntityId) { self.0.borrow_mut().push(Hook::Destroy(entity)) }

    fn on_active_changed(&mut self, entity: EntityId, active: bool) {
        self.0.borrow_mut().push(Hook::ActiveChanged(entity, active))
    }

    fn on_scene_changed(&mut self, entity: EntityId, scene: Option<SceneId>) {
        self.0.borrow_mut().push(Hook::SceneChanged(entity, scene))
    }

    fn on_event(&mut self, entity: EntityId, event: &dyn Any) -> bool {
        match event.downcast_ref::<Ping>() {
            Some(&Ping(value)) => {
                self.0.borrow_mut().push(Hook::Ping(entity, value));
                true
            }
            None => false,
        }
    }
}

/// Moves every non-frozen entity by its velocity.
#[system(ecsworld_as(crate), with(Position, Velocity), without(Frozen))]
pub fn movement(world: &mut World, sample: &Snapshot, _dt: f32) {
    for entity in sample {
        let velocity = *world.get_component::<Velocity>(entity).expect("sample requires Velocity");
        let position =
            world.get_component_mut::<Position>(entity).expect("sample requires Position");
        position.0 += velocity.0;
        position.1 += velocity.1;
    }
}

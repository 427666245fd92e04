//! The world stores all entities, scenes, samples and systems of a simulation.
//!
//! Structural changes are not applied while systems or sample iterations are running.
//! They are queued in the world and applied in FIFO order at the next [flush](World::flush),
//! which happens at the start and the end of every [`World::update`].

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::mem;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::comp::{self, Component};
use crate::entity::ealloc::RecyclePolicy;
use crate::entity::{
    Entity, EntityId, EntityTag, Lifecycle, SampleId, SampleTag, SceneId, SceneTag, Table,
};
use crate::error::{Error, Result};
use crate::event::{self, Subscription};
use crate::sample::{Sample, SampleEvent, SampleObserver, Signature, Snapshot};
use crate::scheduler;
use crate::system::System;
use crate::util::{self, DbgTypeId};

mod builder;
pub use builder::Builder;

pub(crate) mod offline;
use offline::OperationResult;

pub mod scene;
use scene::Scene;

pub mod tracer;
pub use tracer::Tracer;


/// A bundle encapsulates the systems and entities for a specific feature.
/// This can be used by library crates to expose their features as a single API.
pub trait Bundle {
    /// Configures the world and schedules the systems used by this bundle.
    fn register(&self, _builder: &mut Builder) {}

    /// Populates the world with entities and scenes.
    fn populate(&self, _world: &mut World) {}
}

/// Creates a world from bundles.
pub fn new<'t>(bundles: impl IntoIterator<Item = &'t dyn Bundle> + Copy) -> Result<World> {
    let mut builder = Builder::default();

    for bundle in bundles {
        bundle.register(&mut builder);
    }

    let mut world = builder.build()?;

    for bundle in bundles {
        bundle.populate(&mut world);
    }

    Ok(world)
}

/// What the world is currently doing.
#[derive(Debug, Default)]
struct Phase {
    /// Systems or scene logic are running.
    updating:  bool,
    /// Queued operations are being applied.
    flushing:  bool,
    /// Depth of nested [`World::for_each`] calls.
    iterating: usize,
}

impl Phase {
    /// Whether structural changes must be deferred to the next flush.
    fn deferring(&self) -> bool { self.updating || self.flushing || self.iterating > 0 }
}

cfg_if::cfg_if! {
    if #[cfg(any(
        all(debug_assertions, feature = "debug-flush-panic"),
        all(not(debug_assertions), feature = "release-flush-panic"),
    ))] {
        fn on_reentrant_flush() -> Result<()> {
            panic!("flush() cannot be called while a flush, update or iteration is in progress")
        }
    } else {
        fn on_reentrant_flush() -> Result<()> {
            log::error!("Ignoring reentrant flush(), queued operations are kept for the next flush");
            Err(Error::ReentrantFlush)
        }
    }
}

/// Resolves an entity that accepts changes.
pub(crate) fn live_mut(entities: &mut Table<EntityTag, Entity>, id: EntityId) -> Result<&mut Entity> {
    match entities.get_mut(id) {
        Some(entity) if entity.is_alive() => Ok(entity),
        _ => {
            log::debug!("Ignoring operation on stale entity {id:?}");
            Err(Error::StaleEntity(id))
        }
    }
}

/// Calls [`Component::awake`] on components attached since the last flush.
fn awaken(entity: &mut Entity) {
    let id = entity.id();
    for slot in entity.slots_mut() {
        if !slot.awakened && !slot.removing {
            slot.awakened = true;
            slot.value.awake(id);
        }
    }
}

/// The data structure that stores all states of a simulation.
pub struct World {
    name:         String,
    tags:         BTreeSet<String>,
    frame:        u64,
    entities:     Table<EntityTag, Entity>,
    /// Assigns sample filter bits to component types.
    registry:     comp::Registry,
    scenes:       Table<SceneTag, Scene>,
    samples:      Table<SampleTag, Sample>,
    /// Deduplicates samples with equal signatures.
    sample_index: HashMap<Signature, SampleId>,
    offline:      offline::Buffer,
    events:       event::Bus,
    systems:      scheduler::Schedule,
    phase:        Phase,
}

static_assertions::assert_not_impl_any!(World: Send, Sync);

impl World {
    pub(crate) fn new(name: String, tags: BTreeSet<String>, recycle: RecyclePolicy) -> Self {
        Self {
            name,
            tags,
            frame: 0,
            entities: Table::new(recycle),
            registry: comp::Registry::default(),
            scenes: Table::new(recycle),
            samples: Table::new(recycle),
            sample_index: HashMap::new(),
            offline: offline::Buffer::default(),
            events: event::Bus::default(),
            systems: scheduler::Schedule::default(),
            phase: Phase::default(),
        }
    }

    /// The name of the world.
    pub fn name(&self) -> &str { &self.name }

    /// The tags of the world, which select the systems to schedule.
    pub fn tags(&self) -> &BTreeSet<String> { &self.tags }

    /// Number of completed ticks.
    pub fn frame(&self) -> u64 { self.frame }

    /// Number of entities that have not been freed yet.
    pub fn entity_count(&self) -> usize { self.entities.len() }

    /// Reserves capacity for at least `additional` more entities.
    pub fn reserve_entities(&mut self, additional: usize) { self.entities.reserve(additional) }

    /// Number of operations waiting for the next flush.
    pub fn pending_operations(&self) -> usize { self.offline.len() }

    // Entities

    /// Creates an entity.
    ///
    /// The entity joins samples at the next flush.
    pub fn create_entity(&mut self) -> EntityId { self.spawn(None, None) }

    /// Creates a named entity.
    pub fn create_named_entity(&mut self, name: impl Into<String>) -> EntityId {
        self.spawn(Some(name.into()), None)
    }

    pub(crate) fn spawn(&mut self, name: Option<String>, scene: Option<SceneId>) -> EntityId {
        let id = self.entities.insert_with(|id| Entity::new(id, name, scene));
        self.offline.push(offline::AddEntity { entity: id });
        id
    }

    /// Gets an entity that has not been freed.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> { self.entities.get(id) }

    /// Iterates over all entities that have not been freed.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter().map(|(_, entity)| entity)
    }

    /// Whether the entity exists and has not been destroyed.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.get(id).map_or(false, Entity::is_alive)
    }

    /// Destroys an entity.
    ///
    /// The entity is freed at the next flush.
    /// Returns [`Error::StaleEntity`] if the entity has already been destroyed.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<()> {
        let entity = live_mut(&mut self.entities, id)?;
        entity.set_lifecycle(Lifecycle::Removing);
        self.offline.push(offline::DestroyEntity { entity: id });
        Ok(())
    }

    /// Sets the active flag of an entity.
    ///
    /// Hooks and samples observe the change at the next flush.
    pub fn set_active(&mut self, id: EntityId, active: bool) -> Result<()> {
        let entity = live_mut(&mut self.entities, id)?;
        if entity.is_active() != active {
            entity.set_active(active);
            self.offline.push(offline::ActiveChanged { entity: id });
        }
        Ok(())
    }

    /// Queues an event to be delivered to every component of the entity at the next flush.
    pub fn send_event<E: 'static>(&mut self, id: EntityId, event: E) -> Result<()> {
        live_mut(&mut self.entities, id)?;
        self.offline.push(offline::Unicast {
            entity: id,
            ty:     DbgTypeId::of::<E>(),
            event:  Box::new(event),
        });
        Ok(())
    }

    // Components

    /// Attaches a component to an entity.
    ///
    /// [`Component::awake`] is called at the next flush.
    /// Returns [`Error::DuplicateComponent`] without modifying the entity
    /// if it already has a component of type `T`.
    pub fn create_component<T: Component>(&mut self, id: EntityId, value: T) -> Result<&mut T> {
        let ty = DbgTypeId::of::<T>();

        if live_mut(&mut self.entities, id)?.has_type(&ty.id) {
            log::warn!("Entity {id:?} already has a component of type {ty}, rejecting the new one");
            return Err(Error::DuplicateComponent { entity: id, ty: ty.name });
        }

        let bit = self.registry.bit_of(ty);
        let entity = self.entities.get_mut(id).expect("entity was checked to be live");

        if !entity.components_changed {
            entity.components_changed = true;
            self.offline.push(offline::ComponentsChanged { entity: id });
        }

        let slot = entity.insert(ty, bit, comp::Slot::new(Box::new(value)));
        Ok(slot.downcast_mut().expect("slot was created with type T"))
    }

    /// Returns the component of type `T`, attaching a default one if absent.
    pub fn ensure_component<T: Component + Default>(&mut self, id: EntityId) -> Result<&mut T> {
        if live_mut(&mut self.entities, id)?.has::<T>() {
            return Ok(self.get_component_mut::<T>(id).expect("component was checked to exist"));
        }
        self.create_component(id, T::default())
    }

    /// Removes a component from an entity.
    ///
    /// During a flush, an update or a sample iteration,
    /// the component stays attached until the next flush.
    /// Otherwise it is removed immediately and samples are updated synchronously.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Result<()> {
        let ty = DbgTypeId::of::<T>();
        let deferring = self.phase.deferring();

        let entity = live_mut(&mut self.entities, id)?;
        let slot = match entity.slot_mut(&ty.id) {
            Some(slot) => slot,
            None => return Err(Error::MissingComponent { entity: id, ty: ty.name }),
        };

        if slot.removing {
            return Ok(());
        }

        if deferring {
            slot.removing = true;
            self.offline.push(offline::RemoveComponent { entity: id, ty });
        } else {
            self.apply_remove_component(id, ty.id, &tracer::Noop);
        }

        Ok(())
    }

    /// Gets a component of an entity.
    ///
    /// Components stay readable until the entity is freed.
    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(id)?.get::<T>()
    }

    /// Gets a component of an entity mutably.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(id)?.get_mut::<T>()
    }

    // Samples

    /// Requests a sample of the entities matching the signature.
    ///
    /// Returns the existing sample if one with an equal signature has been requested.
    /// Each request must be paired with a [`release_sample`](Self::release_sample).
    pub fn request_sample(&mut self, signature: Signature) -> SampleId {
        if let Some(&id) = self.sample_index.get(&signature) {
            if let Some(sample) = self.samples.get_mut(id) {
                sample.ref_count += 1;
                return id;
            }
        }

        let filter = signature.compile(&mut self.registry);
        let members: IndexSet<EntityId> = self
            .entities
            .iter()
            .filter(|(_, entity)| filter.matches(entity))
            .map(|(id, _)| id)
            .collect();

        log::debug!("Creating sample {signature:?} with {} entities", members.len());

        let index_key = signature.clone();
        let id = self.samples.insert_with(|id| Sample::new(id, signature, filter, members));
        self.sample_index.insert(index_key, id);
        id
    }

    /// Releases a sample requested with [`request_sample`](Self::request_sample).
    ///
    /// The sample is removed when all requests have been released.
    pub fn release_sample(&mut self, id: SampleId) -> Result<()> {
        let sample = self.samples.get_mut(id).ok_or(Error::StaleSample(id))?;
        sample.ref_count -= 1;

        if sample.ref_count == 0 {
            let sample = self.samples.remove(id).expect("sample was just resolved");
            self.sample_index.remove(sample.signature());
            log::debug!("Removed sample {:?}", sample.signature());
        }

        Ok(())
    }

    /// Gets a sample.
    pub fn sample(&self, id: SampleId) -> Option<&Sample> { self.samples.get(id) }

    /// Takes a snapshot of the members of a sample.
    pub fn snapshot(&self, id: SampleId) -> Option<Snapshot> { Some(self.sample(id)?.snapshot()) }

    /// Calls `f` for each member of the sample.
    ///
    /// The members are snapshotted before the first call.
    /// Structural changes requested by `f` are queued until the next flush.
    pub fn for_each(&mut self, sample: SampleId, mut f: impl FnMut(&mut World, EntityId)) -> Result<()> {
        let snapshot = self.snapshot(sample).ok_or(Error::StaleSample(sample))?;

        self.phase.iterating += 1;
        for entity in &snapshot {
            f(self, entity);
        }
        self.phase.iterating -= 1;

        Ok(())
    }

    /// Calls `observer` at every flush that changes the membership of the sample.
    pub fn observe_sample(
        &mut self,
        sample: SampleId,
        observer: impl FnMut(&mut World, SampleEvent) + 'static,
    ) -> Result<SampleObserver> {
        let record = self.samples.get_mut(sample).ok_or(Error::StaleSample(sample))?;
        let id = record.observers.subscribe(Rc::new(RefCell::new(observer)));
        Ok(SampleObserver { sample, id })
    }

    /// Stops an observer registered with [`observe_sample`](Self::observe_sample).
    pub fn unobserve_sample(&mut self, observer: SampleObserver) -> bool {
        match self.samples.get_mut(observer.sample) {
            Some(sample) => sample.observers.unsubscribe(observer.id),
            None => false,
        }
    }

    /// Reevaluates the membership of an entity in every sample.
    fn refresh_samples(&mut self, id: EntityId, tracer: &dyn Tracer) {
        let entity = match self.entities.get(id) {
            Some(entity) => entity,
            None => return,
        };

        let changes: Vec<(SampleId, SampleEvent)> = self
            .samples
            .iter_mut()
            .filter_map(|(sample, record)| Some((sample, record.process_entity(entity)?)))
            .collect();

        for (sample, event) in changes {
            match event {
                SampleEvent::Inserted(entity) => tracer.sample_insert(sample, entity),
                SampleEvent::Removed(entity) => tracer.sample_remove(sample, entity),
            }

            util::dispatch(
                self,
                |world: &World| world.samples.get(sample).map(|record| &record.observers),
                |observer, world| observer(world, event),
            );
        }
    }

    // Events

    /// Subscribes to events of type `E`.
    pub fn subscribe<E: 'static>(
        &mut self,
        handler: impl FnMut(&mut World, &E) + 'static,
    ) -> Subscription {
        self.events.subscribe(handler)
    }

    /// Removes a subscription.
    ///
    /// A handler unsubscribed during a dispatch is not called for the rest of that dispatch.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    /// Queues an event to be dispatched to subscribers at the next flush.
    pub fn broadcast<E: 'static>(&mut self, event: E) {
        self.offline.push(offline::Broadcast { ty: DbgTypeId::of::<E>(), event: Box::new(event) });
    }

    /// Dispatches an event to subscribers immediately.
    pub fn broadcast_immediate<E: 'static>(&mut self, event: &E) {
        self.dispatch_any(TypeId::of::<E>(), event)
    }

    pub(crate) fn dispatch_any(&mut self, ty: TypeId, event: &dyn Any) {
        util::dispatch(self, |world: &World| world.events.handlers(ty), |handler, world| {
            handler(world, event)
        });
    }

    pub(crate) fn deliver_event(&mut self, id: EntityId, event: &dyn Any) {
        let entity = match self.entities.get_mut(id) {
            Some(entity) if entity.lifecycle() == Lifecycle::Live => entity,
            _ => {
                log::debug!("Dropping event for entity {id:?} which is not live");
                return;
            }
        };

        let mut handled = false;
        for slot in entity.slots_mut().filter(|slot| !slot.removing) {
            handled |= slot.value.process_event(id, event);
        }
        if !handled {
            log::trace!("No component of entity {id:?} handled the event");
        }
    }

    // Systems

    /// Registers a system.
    ///
    /// Returns `Ok(false)` if the system requires tags the world does not have.
    pub fn add_system(&mut self, system: Box<dyn System>) -> Result<bool> {
        if self.phase.updating {
            return Err(Error::SystemsLocked);
        }

        let spec = system.spec();
        if !spec.tags.is_subset(&self.tags) {
            log::debug!("Skipping system {} which requires tags {:?}", spec.name, spec.tags);
            return Ok(false);
        }
        if self.systems.contains(&spec.name) {
            return Err(Error::DuplicateSystem(spec.name));
        }

        let sample = self.request_sample(spec.signature.clone());
        if let Err(err) = self.systems.insert(system, spec, sample) {
            self.release_sample(sample).expect("sample was just requested");
            return Err(err);
        }

        Ok(true)
    }

    /// Unregisters a system.
    ///
    /// Returns `Ok(false)` if no system has the name.
    pub fn remove_system(&mut self, name: &str) -> Result<bool> {
        if self.phase.updating {
            return Err(Error::SystemsLocked);
        }

        match self.systems.remove(name)? {
            Some(entry) => {
                if let Err(err) = self.release_sample(entry.sample) {
                    log::debug!("Sample of system {name} was already released: {err}");
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Names of the registered systems in execution order.
    pub fn system_names(&self) -> impl Iterator<Item = &str> + '_ { self.systems.names() }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize { self.systems.len() }

    // Tick

    /// Applies all queued operations.
    ///
    /// # Panics
    /// Panics if called during a flush, an update or a sample iteration
    /// when the flush-panic feature of the build profile is enabled.
    /// Otherwise such calls return [`Error::ReentrantFlush`].
    pub fn flush(&mut self) -> Result<()> { self.flush_with(&tracer::Noop) }

    /// Applies all queued operations, recording events to the tracer.
    pub fn flush_traced(&mut self, tracer: &impl Tracer) -> Result<()> { self.flush_with(tracer) }

    fn flush_with(&mut self, tracer: &dyn Tracer) -> Result<()> {
        if self.phase.deferring() {
            return on_reentrant_flush();
        }

        self.phase.flushing = true;

        let ops = self.offline.take_cycle();
        tracer.start_flush(self.frame, ops.len());

        for op in ops {
            log::trace!("Run {op:?}");
            match op.run(self, tracer) {
                OperationResult::Ok => {}
                OperationResult::QueueForRerun(op) => self.offline.queue_rerun(op),
            }
        }

        self.entities.flush();
        self.scenes.flush();
        self.samples.flush();

        self.phase.flushing = false;
        tracer.end_flush(self.frame, self.offline.rerun_len());

        Ok(())
    }

    /// Runs one tick.
    ///
    /// Flushes, runs every system in order, runs the logic of active scenes, then flushes again.
    pub fn update(&mut self, dt: f32) -> Result<()> { self.update_with(dt, &tracer::Noop) }

    /// Runs one tick, recording events to the tracer.
    pub fn update_traced(&mut self, dt: f32, tracer: &impl Tracer) -> Result<()> {
        self.update_with(dt, tracer)
    }

    fn update_with(&mut self, dt: f32, tracer: &dyn Tracer) -> Result<()> {
        if self.phase.deferring() {
            log::error!("update() cannot be called from a system, a flush or an iteration");
            return Err(Error::ReentrantUpdate);
        }

        tracer.start_tick(self.frame);
        self.flush_with(tracer)?;

        self.phase.updating = true;

        let mut systems = mem::take(&mut self.systems);
        for (position, entry) in systems.iter_mut().enumerate() {
            let snapshot = self.snapshot(entry.sample).unwrap_or_default();

            tracer.start_run_system(position, &entry.spec.name, &mut *entry.system);
            entry.system.execute(self, &snapshot, dt);
            tracer.end_run_system(position, &entry.spec.name, &mut *entry.system);
        }
        self.systems = systems;

        self.update_scenes(dt);

        self.phase.updating = false;

        let result = self.flush_with(tracer);
        tracer.end_tick(self.frame);
        self.frame += 1;
        result
    }

    // Operations applied at flush

    pub(crate) fn join_entity(&mut self, id: EntityId, tracer: &dyn Tracer) {
        let entity = match self.entities.get_mut(id) {
            Some(entity) if entity.lifecycle() == Lifecycle::Adding => entity,
            _ => return,
        };

        entity.set_lifecycle(Lifecycle::Live);
        entity.joined = true;
        entity.reported_active = entity.is_active();
        awaken(entity);

        tracer.join_entity(id);
        self.refresh_samples(id, tracer);
        self.broadcast_immediate(&event::EntityAdded { entity: id });
    }

    pub(crate) fn free_entity(&mut self, id: EntityId, tracer: &dyn Tracer) {
        let joined = match self.entities.get(id) {
            Some(entity) => entity.joined,
            None => return,
        };

        // the entity is no longer live, so this removes it from all samples
        self.refresh_samples(id, tracer);
        if joined {
            self.broadcast_immediate(&event::EntityRemoved { entity: id });
        }

        let mut entity = match self.entities.remove(id) {
            Some(entity) => entity,
            None => return,
        };
        for slot in entity.slots_mut().filter(|slot| slot.awakened) {
            slot.value.destroy(id);
        }

        if let Some(scene) = entity.scene().and_then(|scene| self.scenes.get_mut(scene)) {
            scene.entities.shift_remove(&id);
        }

        tracer.free_entity(id);
    }

    /// Returns `false` if the entity has not joined yet.
    pub(crate) fn apply_components_changed(&mut self, id: EntityId, tracer: &dyn Tracer) -> bool {
        let entity = match self.entities.get_mut(id) {
            Some(entity) => entity,
            None => return true,
        };

        match entity.lifecycle() {
            Lifecycle::Adding => return false,
            Lifecycle::Removing => {
                entity.components_changed = false;
                return true;
            }
            Lifecycle::Live => {}
        }

        entity.components_changed = false;
        awaken(entity);

        self.refresh_samples(id, tracer);
        self.broadcast_immediate(&event::EntityComponentsChanged { entity: id });
        true
    }

    pub(crate) fn apply_remove_component(&mut self, id: EntityId, ty: TypeId, tracer: &dyn Tracer) {
        let bit = self.registry.get(&ty);
        let entity = match self.entities.get_mut(id) {
            Some(entity) => entity,
            None => return,
        };

        let mut slot = match entity.take(&ty, bit) {
            Some(slot) => slot,
            None => return,
        };
        if slot.awakened {
            slot.value.destroy(id);
        }

        if entity.lifecycle() == Lifecycle::Live {
            self.refresh_samples(id, tracer);
            self.broadcast_immediate(&event::EntityComponentsChanged { entity: id });
        }
    }

    pub(crate) fn apply_active_changed(&mut self, id: EntityId, tracer: &dyn Tracer) {
        let entity = match self.entities.get_mut(id) {
            Some(entity) if entity.lifecycle() == Lifecycle::Live => entity,
            _ => return,
        };

        let active = entity.is_active();
        if active == entity.reported_active {
            return;
        }
        entity.reported_active = active;

        for slot in entity.slots_mut().filter(|slot| !slot.removing) {
            slot.value.active_changed(id, active);
        }

        self.refresh_samples(id, tracer);
        self.broadcast_immediate(&event::EntityActiveChanged { entity: id, active });
    }
}

//! Systems are the per-tick logic of a world.
//!
//! Each system declares a [`Spec`] with its name and the [`Signature`] of the entities it processes.
//! The world requests a sample for the signature when the system is registered,
//! and passes a [`Snapshot`] of the sample to [`System::execute`] on every tick.
//!
//! Systems run one after another in registration order,
//! unless reordered by explicit [`before`](Spec::before)/[`after`](Spec::after) constraints.
//! Structural changes made by a system are deferred to the flush at the end of the tick.
//!
//! Systems are usually declared with the [`system`](crate::system) attribute macro:
//!
//! ```
//! # use ecsworld::{comp, system, World};
//! # use ecsworld::sample::Snapshot;
//! #[comp]
//! #[derive(Clone, Copy)]
//! struct Velocity(f32);
//!
//! #[comp]
//! struct Position(f32);
//!
//! #[system(with(Position, Velocity))]
//! fn movement(world: &mut World, sample: &Snapshot, dt: f32) {
//!     for entity in sample {
//!         let Some(&Velocity(v)) = world.get_component::<Velocity>(entity) else { continue };
//!         if let Some(position) = world.get_component_mut::<Position>(entity) {
//!             position.0 += v * dt;
//!         }
//!     }
//! }
//!
//! let mut builder = ecsworld::world::Builder::default();
//! builder.schedule(Box::new(movement));
//! let mut world = builder.build().unwrap();
//! world.update(0.5).unwrap();
//! ```

use std::collections::BTreeSet;

use crate::comp::Component;
use crate::sample::{Signature, Snapshot};
use crate::World;

/// The static description of a system.
#[derive(Debug, Clone, Default)]
pub struct Spec {
    /// The unique name of the system, referenced by ordering constraints.
    pub name:      String,
    /// The entities passed to the system.
    pub signature: Signature,
    /// Names of systems that must run after this system.
    pub before:    Vec<String>,
    /// Names of systems that must run before this system.
    pub after:     Vec<String>,
    /// Tags that the world must have for this system to be scheduled.
    pub tags:      BTreeSet<String>,
}

impl Spec {
    /// Creates a spec with the given name, processing all live entities.
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), ..Self::default() } }

    /// Only processes entities with a component of type `T`.
    pub fn with<T: Component>(mut self) -> Self {
        self.signature = self.signature.with::<T>();
        self
    }

    /// Only processes entities without a component of type `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.signature = self.signature.without::<T>();
        self
    }

    /// Only processes active entities.
    pub fn active_only(mut self) -> Self {
        self.signature = self.signature.active_only();
        self
    }

    /// Runs this system before the named system.
    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.before.push(name.into());
        self
    }

    /// Runs this system after the named system.
    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.after.push(name.into());
        self
    }

    /// Requires the world to have the tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Per-tick logic over the entities of a sample.
pub trait System: 'static {
    /// Describes the system. Only called once when the system is registered.
    fn spec(&self) -> Spec;

    /// Runs the system for one tick.
    ///
    /// `sample` contains the matching entities as of the start of the tick.
    fn execute(&mut self, world: &mut World, sample: &Snapshot, dt: f32);
}

/// A system implemented by a closure.
pub struct FnSystem<F> {
    spec: Spec,
    run:  F,
}

/// Creates a system from a closure.
pub fn from_fn<F>(spec: Spec, run: F) -> FnSystem<F>
where
    F: FnMut(&mut World, &Snapshot, f32) + 'static,
{
    FnSystem { spec, run }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World, &Snapshot, f32) + 'static,
{
    fn spec(&self) -> Spec { self.spec.clone() }

    fn execute(&mut self, world: &mut World, sample: &Snapshot, dt: f32) {
        (self.run)(world, sample, dt)
    }
}

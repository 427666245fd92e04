//! A single-threaded entity-component-system core for real-time simulations.
//!
//! # Overview
//! A [`World`] owns entities, the components attached to them,
//! scenes that group entities under a shared lifecycle,
//! samples that track the entities matching a component signature,
//! and systems that run once per tick.
//!
//! Entities are addressed by [`EntityId`]s, which pack a slot index with a generation.
//! Slots are reused after their entity is freed, but the generation is bumped on every reuse,
//! so an ID held after its entity was destroyed never refers to a newer entity.
//!
//! # Deferred mutation
//! Structural changes (creating and destroying entities, changing the components of an entity,
//! toggling the active flag) are queued and applied in FIFO order at the next
//! [flush](World::flush).
//! [`World::update`] flushes at the start and the end of every tick,
//! so all systems of a tick observe the same sample membership,
//! and a system iterating a sample never sees the changes it requests mid-iteration.
//!
//! # Example
//! ```
//! use ecsworld::sample::Signature;
//! use ecsworld::{comp, World};
//!
//! #[comp]
//! struct Position(i32, i32);
//!
//! let mut world = ecsworld::world::Builder::new("example").build().unwrap();
//! let sample = world.request_sample(Signature::new().with::<Position>());
//!
//! let entity = world.create_entity();
//! world.create_component(entity, Position(1, 2)).unwrap();
//! world.flush().unwrap();
//! assert!(world.sample(sample).unwrap().contains(entity));
//!
//! world.destroy_entity(entity).unwrap();
//! world.flush().unwrap();
//! assert!(!world.sample(sample).unwrap().contains(entity));
//!
//! let reused = world.create_entity();
//! assert_eq!(reused.index(), entity.index());
//! assert_ne!(reused, entity);
//! # let _: &World = &world;
//! ```

#![cfg_attr(not(debug_assertions), deny(missing_docs))]
#![cfg_attr(doc, warn(missing_docs))]

/// Implements [`Component`](comp::Component) for a type.
///
/// ```
/// # use ecsworld::entity::EntityId;
/// #[ecsworld::comp(awake = on_awake)]
/// struct Health(u32);
///
/// fn on_awake(health: &mut Health, _entity: EntityId) { health.0 = 100; }
/// ```
///
/// # Options
/// Options are applied behind the attribute name with parentheses. Multiple options are separated by commas.
///
/// ## `ecsworld_as($path)`
/// Use the path as the `ecsworld` crate.
/// Only used when `ecsworld` is reexported under another path.
///
/// ## `awake = $path`, `destroy = $path`, `active_changed = $path`, `scene_changed = $path`, `process_event = $path`
/// Implements the hook of the same name in [`Component`](comp::Component)
/// by calling the function with a mutable reference to the component
/// followed by the arguments of the hook.
pub use ecsworld_codegen::comp;
/// Declares a [`System`] from a function.
///
/// The function must take exactly three parameters,
/// `(&mut World, &Snapshot, f32)`,
/// matching [`System::execute`].
/// A unit struct with the same name as the function is generated;
/// schedule it with `Box::new(function_name)`.
///
/// # Options
/// ## `name = "..."`
/// The name of the system. Defaults to the function name.
///
/// ## `with($types...)`, `without($types...)`, `active_only`
/// The signature of the sample passed to the system.
///
/// ## `before("name"...)`, `after("name"...)`
/// Ordering constraints against other systems.
///
/// ## `tag("tag"...)`
/// Tags that the world must have for the system to be scheduled.
///
/// ## `ecsworld_as($path)`
/// Use the path as the `ecsworld` crate.
pub use ecsworld_codegen::system;

pub mod comp;

pub mod entity;
pub use entity::{Entity, EntityId};

pub mod error;
pub use error::{Error, Result};

pub mod event;

pub mod sample;

pub(crate) mod scheduler;

pub mod system;
pub use system::System;

#[cfg(any(test, feature = "internal-bench"))]
pub mod test_util;

pub mod world;
pub use world::{new, Bundle, World};

pub mod util;

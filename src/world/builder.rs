use std::collections::BTreeSet;

use super::World;
use crate::entity::ealloc::RecyclePolicy;
use crate::error::Result;
use crate::system::System;

/// This type is used to build a world.
#[derive(Default)]
pub struct Builder {
    name:    String,
    tags:    BTreeSet<String>,
    reserve: usize,
    recycle: RecyclePolicy,
    /// Systems in registration order.
    systems: Vec<Box<dyn System>>,
}

impl Builder {
    /// Creates a builder for a world with the given name.
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), ..Self::default() } }

    /// Adds a tag to the world.
    ///
    /// Systems requiring tags that the world does not have are not scheduled.
    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.insert(tag.into());
        self
    }

    /// Reserves capacity for the given number of entities.
    pub fn reserve_entities(&mut self, count: usize) -> &mut Self {
        self.reserve = count;
        self
    }

    /// Selects the order in which freed entity slots are reused.
    pub fn recycle(&mut self, policy: RecyclePolicy) -> &mut Self {
        self.recycle = policy;
        self
    }

    /// Schedules a system to run after the systems scheduled before it.
    pub fn schedule(&mut self, system: Box<dyn System>) -> &mut Self {
        self.systems.push(system);
        self
    }

    /// Builds the world.
    ///
    /// Fails if the systems have duplicate names or cyclic ordering constraints.
    pub fn build(self) -> Result<World> {
        let mut world = World::new(self.name, self.tags, self.recycle);
        world.reserve_entities(self.reserve);

        for system in self.systems {
            world.add_system(system)?;
        }

        Ok(world)
    }
}

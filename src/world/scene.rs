//! Scenes group the entities of a world under a shared lifecycle.
//!
//! A scene starts in [`SceneState::Created`],
//! becomes [`SceneState::Active`] when [activated](World::activate_scene),
//! and enters the terminal [`SceneState::Destroy`] exactly once.
//! Destroying a scene destroys every entity it owns;
//! the scene itself is detached from the world at the flush that frees the last of them,
//! after which its [`SceneId`] is stale.

use indexmap::IndexSet;

use super::offline;
use crate::entity::{EntityId, SceneId};
use crate::error::{Error, Result};
use crate::event::SceneStateChanged;
use crate::World;

/// The lifecycle state of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneState {
    /// Created but not activated yet.
    Created,
    /// Updated every tick.
    Active,
    /// Being destroyed. This state is terminal.
    Destroy,
}

impl SceneState {
    /// Whether the state machine allows moving from `self` to `to`.
    ///
    /// Returns `Ok(false)` if `self == to`, where the transition is a no-op.
    fn check_transition(self, scene: SceneId, to: Self) -> Result<bool> {
        match (self, to) {
            (from, to) if from == to => Ok(false),
            (Self::Created, Self::Active | Self::Destroy) | (Self::Active, Self::Destroy) => {
                Ok(true)
            }
            (from, to) => Err(Error::InvalidSceneTransition { scene, from, to }),
        }
    }
}

/// User logic attached to a scene.
pub trait SceneLogic: 'static {
    /// Called when the scene is activated, before its state changes to [`SceneState::Active`].
    fn load(&mut self, _scene: &mut SceneMut<'_>) {}

    /// Called every tick while the scene is active, after all systems have run.
    fn update(&mut self, _scene: &mut SceneMut<'_>, _dt: f32) {}
}

/// A group of entities with a shared lifecycle.
pub struct Scene {
    id:                  SceneId,
    name:                String,
    state:               SceneState,
    /// The entities owned by this scene, in creation order.
    pub(crate) entities: IndexSet<EntityId>,
    /// Taken out while the logic is running.
    logic:               Option<Box<dyn SceneLogic>>,
}

impl Scene {
    /// The ID of this scene.
    pub fn id(&self) -> SceneId { self.id }

    /// The name of this scene.
    pub fn name(&self) -> &str { &self.name }

    /// The current state.
    pub fn state(&self) -> SceneState { self.state }

    /// Number of entities owned by this scene, including those being destroyed.
    pub fn len(&self) -> usize { self.entities.len() }

    /// Whether the scene owns no entities.
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Whether the scene owns the entity.
    pub fn contains(&self, entity: EntityId) -> bool { self.entities.contains(&entity) }

    /// Iterates over the entities owned by this scene.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ { self.entities.iter().copied() }
}

/// Mutable access to a scene and its world.
pub struct SceneMut<'w> {
    world: &'w mut World,
    id:    SceneId,
}

impl<'w> SceneMut<'w> {
    /// The ID of the scene.
    pub fn id(&self) -> SceneId { self.id }

    /// The scene, or `None` if it has been detached.
    pub fn scene(&self) -> Option<&Scene> { self.world.scene(self.id) }

    /// The world owning the scene.
    pub fn world(&mut self) -> &mut World { self.world }

    /// Creates an entity owned by this scene.
    pub fn create_entity(&mut self) -> Result<EntityId> { self.world.spawn_in_scene(self.id, None) }

    /// Creates a named entity owned by this scene.
    pub fn create_named_entity(&mut self, name: impl Into<String>) -> Result<EntityId> {
        self.world.spawn_in_scene(self.id, Some(name.into()))
    }

    /// Finds the first entity in this scene with the given name.
    pub fn find_entity(&self, name: &str) -> Option<EntityId> {
        self.world.find_entity(self.id, name)
    }

    /// Destroys every entity of this scene except those in `keep`.
    ///
    /// Returns the number of entities destroyed.
    pub fn destroy_all_entities_except(&mut self, keep: &[EntityId]) -> Result<usize> {
        self.world.destroy_scene_entities(self.id, keep)
    }

    /// Destroys every entity of this scene.
    ///
    /// Returns the number of entities destroyed.
    pub fn destroy_all_entities(&mut self) -> Result<usize> {
        self.world.destroy_scene_entities(self.id, &[])
    }

    /// Activates the scene.
    pub fn activate(&mut self) -> Result<()> { self.world.activate_scene(self.id) }

    /// Destroys the scene.
    pub fn destroy(&mut self) -> Result<()> { self.world.destroy_scene(self.id) }
}

impl World {
    /// Creates a scene in the [`Created`](SceneState::Created) state.
    pub fn create_scene(&mut self, name: impl Into<String>) -> SceneId {
        self.insert_scene(name.into(), None)
    }

    /// Creates a scene driven by the given logic.
    pub fn create_scene_with_logic(
        &mut self,
        name: impl Into<String>,
        logic: impl SceneLogic,
    ) -> SceneId {
        self.insert_scene(name.into(), Some(Box::new(logic)))
    }

    fn insert_scene(&mut self, name: String, logic: Option<Box<dyn SceneLogic>>) -> SceneId {
        let id = self.scenes.insert_with(|id| Scene {
            id,
            name,
            state: SceneState::Created,
            entities: IndexSet::new(),
            logic,
        });
        log::debug!("Created scene {id:?}");
        id
    }

    /// Gets a scene.
    pub fn scene(&self, id: SceneId) -> Option<&Scene> { self.scenes.get(id) }

    /// Iterates over all scenes, including those being destroyed.
    pub fn scenes(&self) -> impl Iterator<Item = &Scene> + '_ {
        self.scenes.iter().map(|(_, scene)| scene)
    }

    /// Gets mutable access to a scene.
    pub fn scene_mut(&mut self, id: SceneId) -> Result<SceneMut<'_>> {
        if !self.scenes.contains(id) {
            return Err(Error::StaleScene(id));
        }
        Ok(SceneMut { world: self, id })
    }

    /// Finds the first entity owned by the scene with the given name.
    pub fn find_entity(&self, scene: SceneId, name: &str) -> Option<EntityId> {
        let scene = self.scenes.get(scene)?;
        scene.entities.iter().copied().find(|&entity| {
            self.entities.get(entity).map_or(false, |entity| {
                entity.is_alive() && entity.name() == Some(name)
            })
        })
    }

    /// Activates a scene.
    ///
    /// [`SceneLogic::load`] is called before the state changes.
    /// Activating an active scene is a no-op.
    pub fn activate_scene(&mut self, id: SceneId) -> Result<()> {
        let scene = self.scenes.get_mut(id).ok_or(Error::StaleScene(id))?;
        if !scene.state.check_transition(id, SceneState::Active)? {
            return Ok(());
        }

        if let Some(mut logic) = scene.logic.take() {
            logic.load(&mut SceneMut { world: self, id });
            if let Some(scene) = self.scenes.get_mut(id) {
                scene.logic = Some(logic);
            }
        }

        // the loader may have changed the state
        let scene = self.scenes.get_mut(id).ok_or(Error::StaleScene(id))?;
        if !scene.state.check_transition(id, SceneState::Active)? {
            return Ok(());
        }
        scene.state = SceneState::Active;

        log::debug!("Activated scene {id:?}");
        self.broadcast_immediate(&SceneStateChanged { scene: id, state: SceneState::Active });
        Ok(())
    }

    /// Destroys a scene and all entities it owns.
    ///
    /// The scene is detached at the next flush.
    /// Destroying a scene that is already being destroyed is a no-op.
    pub fn destroy_scene(&mut self, id: SceneId) -> Result<()> {
        let scene = self.scenes.get_mut(id).ok_or(Error::StaleScene(id))?;
        if !scene.state.check_transition(id, SceneState::Destroy)? {
            return Ok(());
        }
        scene.state = SceneState::Destroy;

        let destroyed = self.destroy_scene_entities(id, &[])?;
        self.offline.push(offline::DetachScene { scene: id });

        log::debug!("Destroying scene {id:?} with {destroyed} entities");
        self.broadcast_immediate(&SceneStateChanged { scene: id, state: SceneState::Destroy });
        Ok(())
    }

    pub(crate) fn destroy_scene_entities(
        &mut self,
        scene: SceneId,
        keep: &[EntityId],
    ) -> Result<usize> {
        let scene = self.scenes.get(scene).ok_or(Error::StaleScene(scene))?;
        let doomed: Vec<EntityId> =
            scene.entities.iter().copied().filter(|entity| !keep.contains(entity)).collect();

        Ok(doomed.into_iter().filter(|&entity| self.destroy_entity(entity).is_ok()).count())
    }

    /// Moves an entity to another scene, or out of any scene.
    ///
    /// [`Component::scene_changed`](crate::comp::Component::scene_changed)
    /// is called on every component of the entity immediately.
    pub fn set_entity_scene(&mut self, entity: EntityId, scene: Option<SceneId>) -> Result<()> {
        if let Some(scene) = scene {
            self.check_scene_accepts_entities(scene)?;
        }

        let record = super::live_mut(&mut self.entities, entity)?;
        let previous = record.scene();
        if previous == scene {
            return Ok(());
        }

        record.set_scene(scene);
        for slot in record.slots_mut().filter(|slot| !slot.removing) {
            slot.value.scene_changed(entity, scene);
        }

        if let Some(previous) = previous.and_then(|previous| self.scenes.get_mut(previous)) {
            previous.entities.shift_remove(&entity);
        }
        if let Some(next) = scene.and_then(|scene| self.scenes.get_mut(scene)) {
            next.entities.insert(entity);
        }

        Ok(())
    }

    fn check_scene_accepts_entities(&self, id: SceneId) -> Result<()> {
        match self.scenes.get(id) {
            Some(scene) if scene.state != SceneState::Destroy => Ok(()),
            _ => {
                log::debug!("Scene {id:?} is stale or being destroyed");
                Err(Error::StaleScene(id))
            }
        }
    }

    pub(crate) fn spawn_in_scene(&mut self, scene: SceneId, name: Option<String>) -> Result<EntityId> {
        self.check_scene_accepts_entities(scene)?;
        let entity = self.spawn(name, Some(scene));
        if let Some(scene) = self.scenes.get_mut(scene) {
            scene.entities.insert(entity);
        }
        Ok(entity)
    }

    /// Removes a destroyed scene.
    ///
    /// Returns `false` if the scene still owns entities.
    pub(crate) fn detach_scene(&mut self, id: SceneId) -> bool {
        match self.scenes.get(id) {
            Some(scene) if !scene.entities.is_empty() => false,
            Some(_) => {
                self.scenes.remove(id);
                log::debug!("Detached scene {id:?}");
                true
            }
            None => true,
        }
    }

    /// Runs the update logic of every active scene.
    pub(crate) fn update_scenes(&mut self, dt: f32) {
        let active: Vec<SceneId> = self
            .scenes
            .iter()
            .filter(|(_, scene)| scene.state == SceneState::Active)
            .map(|(id, _)| id)
            .collect();

        for id in active {
            let logic = self
                .scenes
                .get_mut(id)
                .filter(|scene| scene.state == SceneState::Active)
                .and_then(|scene| scene.logic.take());

            if let Some(mut logic) = logic {
                logic.update(&mut SceneMut { world: self, id }, dt);
                if let Some(scene) = self.scenes.get_mut(id) {
                    scene.logic = Some(logic);
                }
            }
        }
    }
}

//! Tests the scene state machine and scene-owned entities.

use std::cell::RefCell;
use std::rc::Rc;

use crate::event::SceneStateChanged;
use crate::sample::Signature;
use crate::test_util::{self, Position};
use crate::world::scene::{SceneLogic, SceneMut, SceneState};
use crate::Error;

#[test]
fn test_scene_transitions() {
    let mut world = test_util::empty_world();
    let states = Rc::new(RefCell::new(Vec::new()));
    world.subscribe::<SceneStateChanged>({
        let states = states.clone();
        move |_, event| states.borrow_mut().push(event.state)
    });

    let scene = world.create_scene("level");
    assert_eq!(world.scene(scene).map(|scene| scene.state()), Some(SceneState::Created));

    world.activate_scene(scene).expect("created scene can be activated");
    world.activate_scene(scene).expect("activating an active scene is a no-op");
    assert_eq!(world.scene(scene).map(|scene| scene.state()), Some(SceneState::Active));

    world.destroy_scene(scene).expect("active scene can be destroyed");
    world.destroy_scene(scene).expect("destroying twice is a no-op");
    assert_eq!(
        world.activate_scene(scene),
        Err(Error::InvalidSceneTransition {
            scene,
            from: SceneState::Destroy,
            to: SceneState::Active,
        }),
        "destroy is terminal",
    );

    assert_eq!(*states.borrow(), [SceneState::Active, SceneState::Destroy]);

    world.flush().expect("flush outside update");
    assert!(world.scene(scene).is_none(), "empty destroyed scene is detached at flush");
    assert_eq!(world.activate_scene(scene), Err(Error::StaleScene(scene)));
}

#[test]
fn test_created_scene_can_be_destroyed() {
    let mut world = test_util::empty_world();
    let scene = world.create_scene("unused");

    world.destroy_scene(scene).expect("created scene can be destroyed");
    assert_eq!(world.scene(scene).map(|scene| scene.state()), Some(SceneState::Destroy));
}

#[test]
fn test_scene_destroy_cascades() {
    let mut world = test_util::empty_world();
    let sample = world.request_sample(Signature::new().with::<Position>());

    let scene = world.create_scene("level");
    let mut members = Vec::new();
    {
        let mut scene = world.scene_mut(scene).expect("scene exists");
        for i in 0..3 {
            let entity = scene.create_entity().expect("scene accepts entities");
            scene.world().create_component(entity, Position(i, 0)).expect("entity is live");
            members.push(entity);
        }
    }
    let outsider = world.create_entity();
    world.create_component(outsider, Position(9, 9)).expect("entity is live");
    world.flush().expect("flush outside update");
    assert_eq!(world.sample(sample).map(|sample| sample.len()), Some(4));

    world.destroy_scene(scene).expect("scene exists");
    for &member in &members {
        assert!(!world.is_alive(member), "scene entities are destroyed with the scene");
    }
    assert_eq!(
        world.scene_mut(scene).and_then(|mut scene| scene.create_entity()),
        Err(Error::StaleScene(scene)),
        "destroyed scene does not accept entities",
    );

    world.flush().expect("flush outside update");
    assert_eq!(world.sample(sample).map(|sample| sample.len()), Some(1));
    assert!(world.sample(sample).expect("sample is requested").contains(outsider));
    assert!(world.scene(scene).is_none());
    assert_eq!(world.entity_count(), 1);
}

#[test]
fn test_find_and_destroy_except() {
    let mut world = test_util::empty_world();
    let scene = world.create_scene("level");

    let mut scene_mut = world.scene_mut(scene).expect("scene exists");
    let player = scene_mut.create_named_entity("player").expect("scene accepts entities");
    let enemy = scene_mut.create_named_entity("enemy").expect("scene accepts entities");
    let ground = scene_mut.create_named_entity("ground").expect("scene accepts entities");

    assert_eq!(scene_mut.find_entity("enemy"), Some(enemy));
    assert_eq!(scene_mut.find_entity("boss"), None);

    assert_eq!(scene_mut.destroy_all_entities_except(&[player]), Ok(2));
    assert_eq!(scene_mut.find_entity("enemy"), None, "destroyed entities are not found");

    world.flush().expect("flush outside update");
    let scene_record = world.scene(scene).expect("scene is not destroyed");
    assert_eq!(scene_record.entities().collect::<Vec<_>>(), [player]);
    assert!(!world.is_alive(ground));
}

#[test]
fn test_move_entity_between_scenes() {
    let mut world = test_util::empty_world();
    let first = world.create_scene("first");
    let second = world.create_scene("second");

    let entity = world.scene_mut(first).and_then(|mut scene| scene.create_entity()).expect("scene exists");
    world.set_entity_scene(entity, Some(second)).expect("scene accepts entities");

    assert!(!world.scene(first).expect("scene exists").contains(entity));
    assert!(world.scene(second).expect("scene exists").contains(entity));
    assert_eq!(world.entity(entity).and_then(|entity| entity.scene()), Some(second));

    world.destroy_scene(first).expect("scene exists");
    world.flush().expect("flush outside update");
    assert!(world.is_alive(entity), "moved entity survives its former scene");
}

struct Spawner {
    log:     Rc<RefCell<Vec<String>>>,
    spawned: usize,
}

impl SceneLogic for Spawner {
    fn load(&mut self, scene: &mut SceneMut<'_>) {
        assert_eq!(scene.scene().map(|scene| scene.state()), Some(SceneState::Created));
        scene.create_named_entity("loaded").expect("loading scene accepts entities");
        self.log.borrow_mut().push("load".to_string());
    }

    fn update(&mut self, scene: &mut SceneMut<'_>, dt: f32) {
        self.spawned += 1;
        scene.create_entity().expect("active scene accepts entities");
        self.log.borrow_mut().push(format!("update {dt} {}", self.spawned));

        if self.spawned == 2 {
            scene.destroy().expect("active scene can be destroyed");
        }
    }
}

#[test]
fn test_scene_logic() {
    let mut world = test_util::empty_world();
    let log = Rc::new(RefCell::new(Vec::new()));

    let scene = world.create_scene_with_logic("spawner", Spawner { log: log.clone(), spawned: 0 });
    world.update(0.5).expect("update from outside the world");
    assert!(log.borrow().is_empty(), "created scenes are not updated");

    world.activate_scene(scene).expect("created scene can be activated");
    assert!(world.find_entity(scene, "loaded").is_some());

    world.update(0.5).expect("update from outside the world");
    assert_eq!(world.scene(scene).map(|scene| scene.len()), Some(2));

    world.update(0.5).expect("update from outside the world");
    world.update(0.5).expect("update from outside the world");

    assert_eq!(*log.borrow(), ["load", "update 0.5 1", "update 0.5 2"]);
    assert!(world.scene(scene).is_none(), "scene is detached after its entities are freed");
    assert_eq!(world.entity_count(), 0);
}

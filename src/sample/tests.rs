use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{SampleEvent, Signature};
use crate::test_util::{self, Frozen, Health, Position, Velocity};
use crate::{EntityId, World};

fn add_random_components(world: &mut World, rng: &mut StdRng, entity: EntityId) {
    if rng.gen_bool(0.5) {
        world.create_component(entity, Position(0, 0)).expect("entity is live");
    }
    if rng.gen_bool(0.5) {
        world.create_component(entity, Velocity(1, 1)).expect("entity is live");
    }
    if rng.gen_bool(0.3) {
        world.create_component(entity, Frozen).expect("entity is live");
    }
}

#[test]
fn test_sample_exactness_randomized() {
    test_util::init();

    let mut rng = StdRng::seed_from_u64(42);
    let mut world = test_util::empty_world();

    let signatures = [
        Signature::new().with::<Position>(),
        Signature::new().with::<Position>().with::<Velocity>().without::<Frozen>(),
        Signature::new().without::<Velocity>(),
        Signature::new().with::<Velocity>().active_only(),
    ];
    let samples: Vec<_> =
        signatures.iter().map(|signature| world.request_sample(signature.clone())).collect();

    let mut entities = Vec::new();

    for step in 0..300 {
        match rng.gen_range(0..6) {
            0 | 1 => {
                let entity = world.create_entity();
                add_random_components(&mut world, &mut rng, entity);
                entities.push(entity);
            }
            2 if !entities.is_empty() => {
                let entity = entities.swap_remove(rng.gen_range(0..entities.len()));
                world.destroy_entity(entity).expect("entity is live");
            }
            3 if !entities.is_empty() => {
                let entity = entities[rng.gen_range(0..entities.len())];
                let _ = world.remove_component::<Position>(entity);
            }
            4 if !entities.is_empty() => {
                let entity = entities[rng.gen_range(0..entities.len())];
                let _ = world.create_component(entity, Velocity(2, 2));
            }
            5 if !entities.is_empty() => {
                let entity = entities[rng.gen_range(0..entities.len())];
                world.set_active(entity, rng.gen_bool(0.5)).expect("entity is live");
            }
            _ => {}
        }

        if step % 5 == 0 {
            world.flush().expect("flush outside update");

            for (signature, &sample) in signatures.iter().zip(&samples) {
                let sample = world.sample(sample).expect("sample is requested");
                for entity in world.entities() {
                    assert_eq!(
                        sample.contains(entity.id()),
                        signature.matches(entity),
                        "membership of {entity:?} in {signature:?} after flush",
                    );
                }
                assert_eq!(
                    sample.len(),
                    world.entities().filter(|entity| signature.matches(entity)).count(),
                    "{signature:?} should not contain freed entities",
                );
            }
        }
    }
}

#[test]
fn test_process_entity_is_idempotent() {
    let mut world = test_util::empty_world();
    let sample = world.request_sample(Signature::new().with::<Health>());

    let entity = world.create_entity();
    world.create_component(entity, Health(1)).expect("entity is live");
    world.flush().expect("flush outside update");

    let record = world.entity(entity).expect("entity is live");
    let mut copy = super::Sample::new(
        sample,
        Signature::new().with::<Health>(),
        Signature::new().with::<Health>().compile(&mut crate::comp::Registry::default()),
        Default::default(),
    );

    // a fresh registry assigns bit 0 to Health, matching the world registry
    assert_eq!(copy.process_entity(record), Some(SampleEvent::Inserted(entity)));
    assert_eq!(copy.process_entity(record), None, "second call without changes is a no-op");
    assert_eq!(copy.len(), 1);
}

#[test]
fn test_snapshot_is_stable_across_flush() {
    let mut world = test_util::empty_world();
    let sample = world.request_sample(Signature::new().with::<Position>());

    let first = world.create_entity();
    world.create_component(first, Position(0, 0)).expect("entity is live");
    world.flush().expect("flush outside update");

    let snapshot = world.snapshot(sample).expect("sample is requested");

    let second = world.create_entity();
    world.create_component(second, Position(1, 1)).expect("entity is live");
    world.destroy_entity(first).expect("entity is live");
    world.flush().expect("flush outside update");

    assert_eq!(snapshot.iter().collect::<Vec<_>>(), [first], "snapshot must not observe later flushes");
    assert_eq!(
        world.snapshot(sample).expect("sample is requested").iter().collect::<Vec<_>>(),
        [second],
    );
}

#[test]
fn test_request_sample_deduplicates() {
    let mut world = test_util::empty_world();

    let signature = Signature::new().with::<Position>().without::<Frozen>();
    let first = world.request_sample(signature.clone());
    let second = world.request_sample(signature);
    assert_eq!(first, second, "equal signatures share a sample");

    world.release_sample(first).expect("sample has two references");
    assert!(world.sample(first).is_some(), "sample is kept while referenced");

    world.release_sample(second).expect("sample has one reference");
    assert!(world.sample(first).is_none(), "sample is removed with its last reference");
    assert_eq!(world.release_sample(first), Err(crate::Error::StaleSample(first)));
}

#[test]
fn test_new_sample_is_populated() {
    let mut world = test_util::empty_world();

    let entities: Vec<_> = (0..3).map(|_| world.create_entity()).collect();
    for &entity in &entities[1..] {
        world.create_component(entity, Velocity(0, 0)).expect("entity is live");
    }
    world.flush().expect("flush outside update");

    let sample = world.request_sample(Signature::new().with::<Velocity>());
    let members: Vec<_> = world.sample(sample).expect("sample is requested").iter().collect();
    assert_eq!(members, &entities[1..]);
}

#[test]
fn test_sample_observers() {
    let mut world = test_util::empty_world();
    let sample = world.request_sample(Signature::new().with::<Health>());

    let events = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let observer = world
        .observe_sample(sample, {
            let events = events.clone();
            move |_, event| events.borrow_mut().push(event)
        })
        .expect("sample is requested");

    let entity = world.create_entity();
    world.create_component(entity, Health(5)).expect("entity is live");
    world.flush().expect("flush outside update");
    world.remove_component::<Health>(entity).expect("component exists");

    assert_eq!(*events.borrow(), [SampleEvent::Inserted(entity), SampleEvent::Removed(entity)]);

    assert!(world.unobserve_sample(observer));
    world.create_component(entity, Health(6)).expect("entity is live");
    world.flush().expect("flush outside update");
    assert_eq!(events.borrow().len(), 2, "unobserved callbacks are not called");
}

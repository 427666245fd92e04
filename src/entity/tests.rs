use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ealloc::RecyclePolicy;
use super::{EntityId, EntityTag, Generation, Lifecycle, Table};
use crate::test_util::{self, Health, Position};

#[test]
fn test_table_rejects_stale_id() {
    test_util::init();

    let mut table = Table::<EntityTag, &'static str>::new(RecyclePolicy::LowestFirst);

    let first = table.insert_with(|_| "first");
    assert_eq!(table.remove(first), Some("first"));
    assert_eq!(table.get(first), None, "removed slot should not be readable");

    let second = table.insert_with(|_| "second");
    assert_ne!(second.index(), first.index(), "index must not be reused before flush");

    table.flush();
    let third = table.insert_with(|_| "third");
    log::trace!("first = {first:?}, third = {third:?}");

    assert_eq!(third.index(), first.index(), "index should be reused after flush");
    assert_ne!(third.generation(), first.generation());
    assert_eq!(table.get(first), None, "stale ID must not resolve to the new occupant");
    assert_eq!(table.get(third), Some(&"third"));
    assert_eq!(table.remove(first), None, "stale ID must not remove the new occupant");
    assert_eq!(table.len(), 2);
}

#[test]
fn test_exhausted_slot_is_retired() {
    test_util::init();

    let mut table = Table::<EntityTag, u16>::new(RecyclePolicy::MostRecent);

    let first = table.insert_with(|_| 0);
    let mut last = first;
    for round in 1..u16::MAX {
        assert_eq!(last.index(), first.index(), "the only freed slot is reused");
        table.remove(last);
        table.flush();
        last = table.insert_with(|_| round);
    }
    log::trace!("first = {first:?}, last = {last:?}");

    assert_eq!(last.generation(), Generation::MAX);
    assert_eq!(table.len(), 1);

    assert_eq!(table.remove(last), Some(u16::MAX - 1));
    table.flush();
    assert_eq!(table.len(), 0, "retired slots are not counted");

    let fresh = table.insert_with(|_| 1);
    assert_ne!(fresh.index(), first.index(), "retired slot must not be reallocated");
    assert_eq!(table.len(), 1);
    for stale in [first, last] {
        assert_eq!(table.get(stale), None, "stale ID must never resolve again");
        assert_eq!(table.remove(stale), None);
    }
    assert_eq!(table.iter().map(|(id, _)| id).collect::<Vec<_>>(), [fresh]);
}

#[test]
fn test_table_iter_yields_current_ids() {
    let mut table = Table::<EntityTag, u32>::new(RecyclePolicy::MostRecent);

    let ids: Vec<EntityId> = (0..4).map(|i| table.insert_with(|_| i)).collect();
    table.remove(ids[1]);

    let collected: Vec<_> = table.iter().map(|(id, &value)| (id, value)).collect();
    assert_eq!(collected, [(ids[0], 0), (ids[2], 2), (ids[3], 3)]);
}

#[test]
fn test_generation_safety_randomized() {
    test_util::init();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut world = test_util::empty_world();

    let mut live: Vec<EntityId> = Vec::new();
    let mut dead: Vec<EntityId> = Vec::new();

    for round in 0..200 {
        if live.is_empty() || rng.gen_bool(0.6) {
            live.push(world.create_entity());
        } else {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            world.destroy_entity(victim).expect("entity is live");
            dead.push(victim);
        }

        if round % 7 == 0 {
            world.flush().expect("flush outside update");
        }
    }
    world.flush().expect("flush outside update");

    let mut occupants: HashMap<u32, EntityId> = HashMap::new();
    for &id in &live {
        assert!(world.is_alive(id), "{id:?} should still be live");
        assert!(occupants.insert(id.index(), id).is_none(), "two live IDs share a slot");
    }

    for &id in &dead {
        assert!(!world.is_alive(id), "destroyed {id:?} must not validate");
        assert!(world.entity(id).is_none());
        assert_eq!(
            world.destroy_entity(id),
            Err(crate::Error::StaleEntity(id)),
            "operations on stale IDs are rejected",
        );

        if let Some(&occupant) = occupants.get(&id.index()) {
            assert_ne!(occupant.generation(), id.generation(), "reused slot must have a new generation");
        }
    }
}

#[test]
fn test_entity_lifecycle_through_flush() {
    let mut world = test_util::empty_world();

    let entity = world.create_named_entity("player");
    assert_eq!(world.entity(entity).map(|e| e.lifecycle()), Some(Lifecycle::Adding));
    assert_eq!(world.entity(entity).and_then(|e| e.name()), Some("player"));

    world.create_component(entity, Position(1, 2)).expect("entity is live");
    world.create_component(entity, Health(3)).expect("entity is live");

    world.flush().expect("flush outside update");
    let record = world.entity(entity).expect("entity is live");
    assert_eq!(record.lifecycle(), Lifecycle::Live);
    assert_eq!(record.component_count(), 2);
    assert!(record.has::<Position>());
    assert_eq!(record.get::<Health>(), Some(&Health(3)));
    assert_eq!(
        record.component_types().map(|ty| ty.name).collect::<Vec<_>>(),
        [std::any::type_name::<Position>(), std::any::type_name::<Health>()],
        "component types are kept in attachment order",
    );

    world.destroy_entity(entity).expect("entity is live");
    assert_eq!(world.entity(entity).map(|e| e.lifecycle()), Some(Lifecycle::Removing));
    assert!(!world.is_alive(entity));
    assert_eq!(world.get_component::<Health>(entity), Some(&Health(3)), "readable until freed");

    world.flush().expect("flush outside update");
    assert!(world.entity(entity).is_none());
    assert_eq!(world.entity_count(), 0);
}

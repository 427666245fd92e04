//! Tests event subscriptions and dispatch order.

use std::cell::RefCell;
use std::rc::Rc;

use crate::event::{EntityActiveChanged, EntityAdded, EntityComponentsChanged, EntityRemoved};
use crate::test_util::{self, Ping, Position};

#[test]
fn test_core_events_follow_flush() {
    let mut world = test_util::empty_world();
    let log = Rc::new(RefCell::new(Vec::new()));

    world.subscribe::<EntityAdded>({
        let log = log.clone();
        move |_, event| log.borrow_mut().push(format!("added {:?}", event.entity))
    });
    world.subscribe::<EntityComponentsChanged>({
        let log = log.clone();
        move |_, event| log.borrow_mut().push(format!("changed {:?}", event.entity))
    });
    world.subscribe::<EntityActiveChanged>({
        let log = log.clone();
        move |_, event| log.borrow_mut().push(format!("active {:?} {}", event.entity, event.active))
    });
    world.subscribe::<EntityRemoved>({
        let log = log.clone();
        move |world, event| {
            assert!(
                world.get_component::<Position>(event.entity).is_some(),
                "components are readable while the removal is dispatched",
            );
            log.borrow_mut().push(format!("removed {:?}", event.entity))
        }
    });

    let entity = world.create_entity();
    world.create_component(entity, Position(0, 0)).expect("entity is live");
    assert!(log.borrow().is_empty(), "events are dispatched at flush");

    world.flush().expect("flush outside update");
    world.set_active(entity, false).expect("entity is live");
    world.flush().expect("flush outside update");
    world.destroy_entity(entity).expect("entity is live");
    world.flush().expect("flush outside update");

    assert_eq!(
        *log.borrow(),
        [
            format!("added {entity:?}"),
            format!("changed {entity:?}"),
            format!("active {entity:?} false"),
            format!("removed {entity:?}"),
        ],
    );
}

#[test]
fn test_unflushed_entity_has_no_removed_event() {
    let mut world = test_util::empty_world();
    let removed = Rc::new(RefCell::new(0));

    world.subscribe::<EntityRemoved>({
        let removed = removed.clone();
        move |_, _| *removed.borrow_mut() += 1
    });

    let entity = world.create_entity();
    world.destroy_entity(entity).expect("entity is live");
    world.flush().expect("flush outside update");

    assert_eq!(*removed.borrow(), 0, "the entity never joined");
    assert!(world.entity(entity).is_none());
}

#[test]
fn test_broadcast_is_queued() {
    let mut world = test_util::empty_world();
    let received = Rc::new(RefCell::new(Vec::new()));

    world.subscribe::<Ping>({
        let received = received.clone();
        move |_, &Ping(value)| received.borrow_mut().push(value)
    });

    world.broadcast(Ping(1));
    world.broadcast_immediate(&Ping(2));
    assert_eq!(*received.borrow(), [2]);

    world.flush().expect("flush outside update");
    assert_eq!(*received.borrow(), [2, 1]);
}

#[test]
fn test_unsubscribe_during_dispatch() {
    let mut world = test_util::empty_world();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let victim = Rc::new(RefCell::new(None));

    world.subscribe::<Ping>({
        let calls = calls.clone();
        let victim = victim.clone();
        move |world, _| {
            calls.borrow_mut().push("first");
            if let Some(subscription) = victim.borrow_mut().take() {
                assert!(world.unsubscribe(subscription));
            }
        }
    });
    let subscription = world.subscribe::<Ping>({
        let calls = calls.clone();
        move |_, _| calls.borrow_mut().push("second")
    });
    *victim.borrow_mut() = Some(subscription);

    world.broadcast_immediate(&Ping(0));
    assert_eq!(*calls.borrow(), ["first"], "unsubscribed handler is skipped in the same dispatch");

    world.broadcast_immediate(&Ping(0));
    assert_eq!(*calls.borrow(), ["first", "first"]);
    assert!(!world.unsubscribe(subscription), "already unsubscribed");
}

#[test]
fn test_subscribe_during_dispatch_takes_effect_later() {
    let mut world = test_util::empty_world();
    let calls = Rc::new(RefCell::new(0));

    world.subscribe::<Ping>({
        let calls = calls.clone();
        let mut subscribed = false;
        move |world, _| {
            if !subscribed {
                subscribed = true;
                let calls = calls.clone();
                world.subscribe::<Ping>(move |_, _| *calls.borrow_mut() += 1);
            }
        }
    });

    world.broadcast_immediate(&Ping(0));
    assert_eq!(*calls.borrow(), 0, "new handler is not called in the current dispatch");

    world.broadcast_immediate(&Ping(0));
    assert_eq!(*calls.borrow(), 1);
}

//! Integration tests for contact and impact routing.

use std::cell::RefCell;
use std::rc::Rc;

use hinge::hinge_core::{ContactEquation, KernelEvent, KernelEventKind, ShapeRef, Vec2};
use hinge::{BodyHandle, Detached, World, WorldConfig, WorldEvent};

type Seen = Rc<RefCell<Vec<(BodyHandle, Option<BodyHandle>, ShapeRef, ShapeRef)>>>;

fn world_with_pair() -> (World, BodyHandle, ShapeRef, BodyHandle, ShapeRef) {
    let mut world = World::new(WorldConfig::default()).unwrap();
    let a = world.create_body(100.0, 100.0, 1.0, true);
    let b = world.create_body(120.0, 100.0, 1.0, true);
    let sa = world.add_circle(a, 10.0, 0.0, 0.0, 0.0).unwrap();
    let sb = world.add_circle(b, 10.0, 0.0, 0.0, 0.0).unwrap();
    (world, a, sa, b, sb)
}

fn equation(shape_a: ShapeRef, shape_b: ShapeRef) -> ContactEquation {
    ContactEquation {
        body_a: shape_a.body,
        body_b: shape_b.body,
        normal_a: Vec2::new(1.0, 0.0),
        contact_point_a: Vec2::new(0.5, 0.0),
        contact_point_b: Vec2::new(-0.5, 0.0),
        restitution: 0.0,
    }
}

fn record(world: &mut World, body: BodyHandle, begin: bool) -> Seen {
    let seen: Seen = Rc::default();
    let sink = Rc::clone(&seen);
    let callback = move |c: &hinge::BodyContact, _: &mut hinge::PendingRemovals| {
        sink.borrow_mut().push((c.this, c.other, c.this_shape, c.other_shape));
    };
    if begin {
        world.on_begin_contact(body, callback);
    } else {
        world.on_end_contact(body, callback);
    }
    seen
}

#[test]
fn test_begin_contact_fires_three_notifications() {
    let (mut world, a, sa, b, sb) = world_with_pair();
    let seen_a = record(&mut world, a, true);
    let seen_b = record(&mut world, b, true);
    let events = world.events();
    events.drain();

    assert!(world.kernel_mut().emit(KernelEvent::BeginContact {
        shape_a: sa,
        shape_b: sb,
        equations: vec![equation(sa, sb)],
    }));
    world.update(&mut Detached);

    let aggregate: Vec<_> = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, WorldEvent::BeginContact { .. }))
        .collect();
    assert_eq!(aggregate.len(), 1);
    let WorldEvent::BeginContact {
        body_a,
        body_b,
        shape_a,
        shape_b,
        equations,
    } = &aggregate[0]
    else {
        panic!("expected begin contact");
    };
    assert_eq!((*body_a, *body_b), (a, b));
    assert_eq!((*shape_a, *shape_b), (sa, sb));
    assert_eq!(equations.len(), 1);

    assert_eq!(seen_a.borrow().as_slice(), &[(a, Some(b), sa, sb)]);
    assert_eq!(seen_b.borrow().as_slice(), &[(b, Some(a), sb, sa)]);
}

#[test]
fn test_end_contact_routed_both_ways() {
    let (mut world, a, sa, b, sb) = world_with_pair();
    let seen_a = record(&mut world, a, false);
    let seen_b = record(&mut world, b, false);
    let events = world.events();
    events.drain();

    world.kernel_mut().emit(KernelEvent::EndContact { shape_a: sa, shape_b: sb });
    world.update(&mut Detached);

    assert_eq!(
        events.drain(),
        vec![WorldEvent::EndContact {
            body_a: a,
            body_b: b,
            shape_a: sa,
            shape_b: sb,
        }]
    );
    assert_eq!(seen_a.borrow().len(), 1);
    assert_eq!(seen_b.borrow().as_slice(), &[(b, Some(a), sb, sa)]);
}

#[test]
fn test_contact_with_unwrapped_body() {
    let mut world = World::new(WorldConfig::with_viewport(800.0, 600.0)).unwrap();
    let ball = world.create_body(400.0, 590.0, 1.0, true);
    let shape = world.add_circle(ball, 10.0, 0.0, 0.0, 0.0).unwrap();
    let floor = ShapeRef::new(world.wall(hinge::Wall::Bottom).unwrap(), 0);
    let seen = record(&mut world, ball, true);
    let events = world.events();
    events.drain();

    world.kernel_mut().emit(KernelEvent::BeginContact {
        shape_a: floor,
        shape_b: shape,
        equations: Vec::new(),
    });
    world.update(&mut Detached);

    assert!(events.drain().iter().all(|e| !matches!(e, WorldEvent::BeginContact { .. })));
    assert_eq!(seen.borrow().as_slice(), &[(ball, None, shape, floor)]);
}

#[test]
fn test_contact_callback_defers_removal() {
    let (mut world, a, sa, _b, sb) = world_with_pair();
    world.on_begin_contact(a, |contact, pending| {
        pending.push(contact.this);
    });

    world.kernel_mut().emit(KernelEvent::BeginContact {
        shape_a: sa,
        shape_b: sb,
        equations: Vec::new(),
    });
    world.update(&mut Detached);
    assert!(world.contains_body(a));
    assert!(world.is_removal_pending(a));

    world.update(&mut Detached);
    assert!(!world.contains_body(a));
}

#[test]
fn test_detached_contacts_are_not_queued() {
    let (mut world, a, sa, _b, sb) = world_with_pair();
    let seen = record(&mut world, a, true);
    world.clear();

    assert!(!world.kernel_mut().emit(KernelEvent::BeginContact {
        shape_a: sa,
        shape_b: sb,
        equations: Vec::new(),
    }));
    world.update(&mut Detached);
    assert!(seen.borrow().is_empty());
}

// =============================================================================
// Impact
// =============================================================================

#[test]
fn test_impact_attach_is_idempotent() {
    let mut world = World::new(WorldConfig::default()).unwrap();
    assert!(!world.impact_events());

    world.set_impact_events(true);
    world.set_impact_events(true);
    assert_eq!(world.kernel().listener_count(KernelEventKind::Impact), 1);

    world.set_impact_events(false);
    assert_eq!(world.kernel().listener_count(KernelEventKind::Impact), 0);
    assert!(!world.impact_events());
}

#[test]
fn test_impact_off_by_default() {
    let (mut world, _a, sa, _b, sb) = world_with_pair();
    assert!(!world.kernel_mut().emit(KernelEvent::Impact { shape_a: sa, shape_b: sb }));
}

#[test]
fn test_impact_dispatches_body_and_group_callbacks() {
    let (mut world, a, sa, b, sb) = world_with_pair();
    world.set_impact_events(true);
    let group = world.create_collision_group(Some(b.into())).unwrap();

    let by_body = Rc::new(RefCell::new(0));
    let by_group = Rc::new(RefCell::new(0));
    let reverse = Rc::new(RefCell::new(0));
    {
        let by_body = Rc::clone(&by_body);
        world.on_impact_with_body(a, b, move |contact, _| {
            assert_eq!(contact.other, b);
            *by_body.borrow_mut() += 1;
        });
    }
    {
        let by_group = Rc::clone(&by_group);
        world.on_impact_with_group(a, group, move |contact, _| {
            assert_eq!(contact.this, a);
            *by_group.borrow_mut() += 1;
        });
    }
    {
        let reverse = Rc::clone(&reverse);
        world.on_impact_with_body(b, a, move |contact, _| {
            assert_eq!(contact.this_shape, sb);
            assert_eq!(contact.other_shape, sa);
            *reverse.borrow_mut() += 1;
        });
    }

    assert!(world.kernel_mut().emit(KernelEvent::Impact { shape_a: sa, shape_b: sb }));
    world.update(&mut Detached);

    assert_eq!(*by_body.borrow(), 1);
    assert_eq!(*by_group.borrow(), 1);
    assert_eq!(*reverse.borrow(), 1);

    assert!(world.remove_impact_with_body(a, b));
    assert!(!world.remove_impact_with_body(a, b));
    world.kernel_mut().emit(KernelEvent::Impact { shape_a: sa, shape_b: sb });
    world.update(&mut Detached);
    assert_eq!(*by_body.borrow(), 1);
    assert_eq!(*by_group.borrow(), 2);
}

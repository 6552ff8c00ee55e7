//! End-to-end scheduler scenarios exercised through the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use archetype_ecs::{impl_component, EcsError, Executor, SchedulerBuilder, SystemBuilder, World};

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}
impl_component!(Position { x: f32, y: f32 });

#[derive(Debug, Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}
impl_component!(Velocity { dx: f32, dy: f32 });

#[derive(Debug, Clone, Copy)]
struct Health {
    hp: i32,
}
impl_component!(Health { hp: i32 });

#[test]
fn physics_and_render_run_in_separate_stages() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let physics_order = order.clone();
    let render_order = order.clone();

    let mut scheduler = SchedulerBuilder::new()
        .add_system(
            SystemBuilder::new("physics")
                .writes::<Position>()
                .build(move |_world| {
                    physics_order.lock().unwrap().push("physics");
                    Ok(())
                }),
        )
        .unwrap()
        .add_system(
            SystemBuilder::new("render")
                .reads::<Position>()
                .build(move |_world| {
                    render_order.lock().unwrap().push("render");
                    Ok(())
                }),
        )
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(scheduler.stages().len(), 2);

    let mut world = World::new();
    let executor = Executor::with_worker_count(2);
    executor.run(&mut scheduler, &mut world).unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["physics", "render"]);
}

#[test]
fn independent_writers_share_a_stage() {
    let mut scheduler = SchedulerBuilder::new()
        .add_system(SystemBuilder::new("move_positions").writes::<Position>().build(|_| Ok(())))
        .unwrap()
        .add_system(SystemBuilder::new("apply_damage").writes::<Health>().build(|_| Ok(())))
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(scheduler.stages().len(), 1);
    assert_eq!(scheduler.stages()[0].system_indices.len(), 2);

    let mut world = World::new();
    let executor = Executor::with_worker_count(2);
    executor.run(&mut scheduler, &mut world).unwrap();
}

#[test]
fn conflict_cascade_forces_every_conflicting_pair_into_its_own_stage() {
    let mut scheduler = SchedulerBuilder::new()
        .add_system(SystemBuilder::new("writer_a").writes::<Position>().build(|_| Ok(())))
        .unwrap()
        .add_system(SystemBuilder::new("reader_b").reads::<Position>().build(|_| Ok(())))
        .unwrap()
        .add_system(SystemBuilder::new("writer_c").writes::<Position>().build(|_| Ok(())))
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(scheduler.stages().len(), 3);
}

#[test]
fn explicit_ordering_overrides_conflict_free_packing() {
    let mut scheduler = SchedulerBuilder::new()
        .add_system(SystemBuilder::new("second").reads::<Velocity>().build(|_| Ok(())))
        .unwrap()
        .add_system(SystemBuilder::new("first").reads::<Position>().build(|_| Ok(())))
        .unwrap()
        .order("first", "second")
        .build()
        .unwrap();

    assert_eq!(scheduler.stages().len(), 2);
    assert_eq!(scheduler.stages()[0].system_indices, vec![1]);
    assert_eq!(scheduler.stages()[1].system_indices, vec![0]);
}

#[test]
fn circular_explicit_ordering_is_rejected_at_build_time() {
    let result = SchedulerBuilder::new()
        .add_system(SystemBuilder::new("a").build(|_| Ok(())))
        .unwrap()
        .add_system(SystemBuilder::new("b").build(|_| Ok(())))
        .unwrap()
        .add_system(SystemBuilder::new("c").build(|_| Ok(())))
        .unwrap()
        .order("a", "b")
        .order("b", "c")
        .order("c", "a")
        .build();

    assert!(matches!(result, Err(EcsError::CircularDependency { .. })));
}

#[test]
fn query_cache_stays_consistent_after_new_archetypes_are_spawned() {
    let mut world = World::new();
    for i in 0..10 {
        world.spawn((Position { x: i as f32, y: 0.0 },));
    }
    let before = world.query().with_read_only::<Position>().build();
    assert_eq!(before.count(), 10);

    for i in 0..5 {
        world.spawn((Position { x: i as f32, y: 0.0 }, Velocity { dx: 0.0, dy: 0.0 }));
    }
    let after = world.query().with_read_only::<Position>().build();
    assert_eq!(after.count(), 15);
}

#[test]
fn failing_system_stops_stage_execution_and_reports_its_name() {
    let ran_after = Arc::new(AtomicUsize::new(0));
    let ran_after_clone = ran_after.clone();

    let mut scheduler = SchedulerBuilder::new()
        .add_system(SystemBuilder::new("boom").writes::<Position>().build(|_| Err("failure".into())))
        .unwrap()
        .add_system(
            SystemBuilder::new("after")
                .writes::<Velocity>()
                .build(move |_| {
                    ran_after_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(scheduler.stages().len(), 1, "disjoint access should still share a stage");

    let mut world = World::new();
    let executor = Executor::with_worker_count(2);
    let result = executor.run(&mut scheduler, &mut world);
    assert!(result.is_err());
}

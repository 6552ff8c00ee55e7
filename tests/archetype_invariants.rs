//! Property-style invariants exercised end-to-end through `World`.

use archetype_ecs::{impl_component, World};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}
impl_component!(Position { x: f32, y: f32 });

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tag {
    label: i32,
}
impl_component!(Tag { label: i32 });

#[test]
fn decomposition_round_trip_preserves_every_field() {
    let mut world = World::new();
    let entities: Vec<_> = (0..50)
        .map(|i| world.spawn((Position { x: i as f32, y: -(i as f32) },)))
        .collect();

    for (i, &e) in entities.iter().enumerate() {
        assert_eq!(
            world.get_component::<Position>(e),
            Some(Position { x: i as f32, y: -(i as f32) })
        );
    }
}

#[test]
fn read_after_write_is_immediately_visible() {
    let mut world = World::new();
    let e = world.spawn((Position { x: 0.0, y: 0.0 }, Tag { label: 1 }));

    assert!(world.set_component(e, Position { x: 3.0, y: 4.0 }));
    assert_eq!(world.get_component::<Position>(e), Some(Position { x: 3.0, y: 4.0 }));
    // Writing one component never disturbs a sibling column in the same row.
    assert_eq!(world.get_component::<Tag>(e), Some(Tag { label: 1 }));
}

#[test]
fn column_lengths_stay_equal_after_interleaved_spawns_and_despawns() {
    let mut world = World::new();
    let mut entities = Vec::new();
    for i in 0..20 {
        entities.push(world.spawn((Position { x: i as f32, y: 0.0 }, Tag { label: i })));
    }
    // Despawn every third entity, then spawn a few more of the same shape.
    for (i, &e) in entities.iter().enumerate() {
        if i % 3 == 0 {
            world.despawn(e);
        }
    }
    for i in 20..25 {
        world.spawn((Position { x: i as f32, y: 0.0 }, Tag { label: i }));
    }

    let query = world.query().with_read_only::<Position>().with_read_only::<Tag>().build();
    let mut visited = 0;
    query.for_each2(
        |pos: archetype_ecs::ReadOnly<Position>, tag: archetype_ecs::ReadOnly<Tag>| {
            assert_eq!(pos.x, tag.label as f32);
            visited += 1;
        },
    );
    assert_eq!(visited, query.count());
}

#[test]
fn despawning_a_nonexistent_entity_is_a_harmless_no_op() {
    let mut world = World::new();
    let e = world.spawn((Position { x: 1.0, y: 1.0 },));
    assert!(world.despawn(e));
    assert!(!world.despawn(e));
    assert_eq!(world.len(), 0);
}

#[test]
fn without_filter_is_reflected_in_the_cached_match_set_for_new_archetypes() {
    let mut world = World::new();
    world.spawn((Position { x: 0.0, y: 0.0 }, Tag { label: 0 }));

    let tagged_only = world.query().with_read_only::<Position>().without::<Tag>().build();
    assert_eq!(tagged_only.count(), 0);

    world.spawn((Position { x: 1.0, y: 1.0 },));
    let tagged_only_again = world.query().with_read_only::<Position>().without::<Tag>().build();
    assert_eq!(tagged_only_again.count(), 1);
}

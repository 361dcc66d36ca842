//! # Streaming Scenarios
//!
//! End-to-end walks through the world facade with a headless host.

use std::collections::HashSet;

use drift_common::ChunkIndex;
use drift_world::{
    HeadlessHost, InfiniteWorld, OriginConfig, SceneHost, StreamingConfig, TrackedEntity,
    TrackedKind, ViewShape,
};
use glam::{DVec3, Vec3};
use proptest::prelude::*;

fn world(view_distance: i32, view_shape: ViewShape) -> InfiniteWorld {
    InfiniteWorld::builder()
        .streaming(StreamingConfig {
            chunk_size: 50.0,
            view_distance,
            tick_interval: 0.0,
            view_shape,
        })
        .build()
        .expect("valid config")
}

fn live_set(world: &InfiniteWorld) -> HashSet<ChunkIndex> {
    world.streaming().store().indices().collect()
}

fn block(x0: i32, x1: i32, z0: i32, z1: i32) -> HashSet<ChunkIndex> {
    (x0..=x1)
        .flat_map(|x| (z0..=z1).map(move |z| ChunkIndex::new(x, z)))
        .collect()
}

fn diamond(center: ChunkIndex, radius: u32) -> HashSet<ChunkIndex> {
    let r = radius as i32;
    block(center.x - r, center.x + r, center.z - r, center.z + r)
        .into_iter()
        .filter(|index| center.distance(*index) <= radius)
        .collect()
}

/// Diamond window: moving one chunk east trades the west edge for the east tip.
#[test]
fn test_diamond_scenario() {
    let mut world = world(2, ViewShape::Diamond);
    let mut host = HeadlessHost::new();

    world.tick(0.1, &mut host);
    assert_eq!(live_set(&world), diamond(ChunkIndex::ZERO, 2));
    assert_eq!(live_set(&world).len(), 13);

    host.move_observer(Vec3::new(50.0, 0.0, 0.0));
    let pass = world.tick(0.1, &mut host).pass.expect("chunk changed");

    let after = diamond(ChunkIndex::new(1, 0), 2);
    assert_eq!(live_set(&world), after);
    assert!(pass.loaded.contains(&ChunkIndex::new(3, 0)));
    for index in &pass.released {
        assert!(index.x <= 0, "released {index} outside the trailing edge");
    }
    assert!(pass.released.contains(&ChunkIndex::new(-2, 0)));
    assert!(pass.failed.is_empty());
    assert_eq!(host.chunk_root_count(), 13);
}

/// Square window: a 5x5 block that slides one column east.
#[test]
fn test_square_scenario() {
    let mut world = world(2, ViewShape::Square);
    let mut host = HeadlessHost::new();

    world.tick(0.1, &mut host);
    assert_eq!(live_set(&world), block(-2, 2, -2, 2));

    host.move_observer(Vec3::new(50.0, 0.0, 0.0));
    let pass = world.tick(0.1, &mut host).pass.expect("chunk changed");

    assert_eq!(live_set(&world), block(-1, 3, -2, 2));
    let released: HashSet<_> = pass.released.into_iter().collect();
    let loaded: HashSet<_> = pass.loaded.into_iter().collect();
    assert_eq!(released, block(-2, -2, -2, 2));
    assert_eq!(loaded, block(3, 3, -2, 2));
}

/// A long walk with shifts: chunk membership follows the absolute position only.
#[test]
fn test_long_walk_with_origin_shifts() {
    let mut world = InfiniteWorld::builder()
        .streaming(StreamingConfig {
            tick_interval: 0.0,
            ..Default::default()
        })
        .origin(OriginConfig {
            threshold: 300.0,
            ..Default::default()
        })
        .build()
        .expect("valid config");
    let mut host = HeadlessHost::new();

    let mut absolute = DVec3::ZERO;
    for _ in 0..400 {
        host.move_observer(Vec3::new(7.5, 0.0, -3.0));
        absolute += DVec3::new(7.5, 0.0, -3.0);
        world.tick(0.016, &mut host);

        let snapshot = world.snapshot();
        let observer = snapshot.observer_absolute.expect("observer present");
        assert!((observer - absolute).length() < 1e-2);
        let local = host.observer_position().expect("observer present");
        assert!(local.length() <= 300.0 + 7.5 + 3.0);

        let center = snapshot.observer_chunk.expect("pass ran");
        assert_eq!(live_set(&world), diamond(center, 2));
    }
    assert!(world.origin().shift_count() > 0);
    assert_eq!(host.chunk_root_count(), 13);
}

/// A failing chunk leaves no handles and loads once the host recovers.
#[test]
fn test_failed_chunk_recovers() {
    let mut world = world(1, ViewShape::Diamond);
    let mut host = HeadlessHost::new();
    let broken = ChunkIndex::new(0, -1);
    host.fail_chunk(broken);

    let pass = world.tick(0.1, &mut host).pass.expect("first pass");
    assert_eq!(pass.failed, vec![broken]);
    assert!(!live_set(&world).contains(&broken));
    assert_eq!(host.chunk_root(broken), None);
    assert_eq!(host.chunk_root_count(), 4);

    host.heal_chunk(broken);
    let retry = world.tick(0.1, &mut host).pass.expect("retry");
    assert_eq!(retry.loaded, vec![broken]);
    assert_eq!(live_set(&world), diamond(ChunkIndex::ZERO, 1));
    assert_eq!(world.snapshot().streaming.failures, 1);
}

/// A failed chunk that leaves the window is simply forgotten.
#[test]
fn test_failed_chunk_left_behind() {
    let mut world = world(1, ViewShape::Diamond);
    let mut host = HeadlessHost::new();
    host.fail_chunk(ChunkIndex::new(-1, 0));

    world.tick(0.1, &mut host);
    host.move_observer(Vec3::new(100.0, 0.0, 0.0));
    let pass = world.tick(0.1, &mut host).pass.expect("chunk changed");
    assert!(pass.failed.is_empty());
    assert_eq!(live_set(&world), diamond(ChunkIndex::new(2, 0), 1));
    assert!(world.tick(0.1, &mut host).pass.is_none());
}

/// Tracked entities and chunk roots keep their absolute positions across shifts.
#[test]
fn test_shift_preserves_scene() {
    let mut world = world(1, ViewShape::Diamond);
    let mut host = HeadlessHost::with_observer(Vec3::new(1000.0, 0.0, 0.0));
    let body = host.spawn_body(Vec3::new(1020.0, 1.0, 5.0));
    world.track(TrackedEntity::new(body, TrackedKind::RigidBody));

    world.tick(0.1, &mut host);
    let root = world
        .streaming()
        .get_chunk_at(ChunkIndex::new(20, 0))
        .expect("live")
        .root();
    let root_before = world.to_absolute(host.position(root).expect("alive"));

    host.move_observer(Vec3::new(10.0, 0.0, 0.0));
    let report = world.tick(0.1, &mut host);
    let shift = report.shift.expect("past threshold");
    assert_eq!(shift.offset, Vec3::new(1010.0, 0.0, 0.0));
    assert!(report.pass.is_none());

    assert_eq!(host.observer_position().expect("observer present"), Vec3::ZERO);
    assert_eq!(world.to_absolute(host.position(root).expect("alive")), root_before);
    assert_eq!(host.position(body), Some(Vec3::new(10.0, 1.0, 5.0)));
    assert_eq!(host.body_recenter_count(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_live_set_equals_window(
        moves in prop::collection::vec((-180.0f32..180.0, -180.0f32..180.0), 1..12),
        view_distance in 0i32..4,
        square in any::<bool>(),
    ) {
        let shape = if square { ViewShape::Square } else { ViewShape::Diamond };
        let mut world = world(view_distance, shape);
        let mut host = HeadlessHost::new();

        for (dx, dz) in moves {
            host.move_observer(Vec3::new(dx, 0.0, dz));
            world.tick(0.1, &mut host);

            let center = world.streaming().observer_chunk().expect("pass ran");
            let expected: HashSet<_> = world.streaming().window(center).collect();
            prop_assert_eq!(live_set(&world), expected);
            prop_assert_eq!(host.chunk_root_count(), world.streaming().live_count());
        }
    }
}

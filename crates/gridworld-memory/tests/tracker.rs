use gridworld_core::{
    AvatarSpec, EntityId, GridShape, Location, ObjectKind, ObjectSpec, Observation,
    SenseCapability, TypeFilter, WorldState,
};
use gridworld_memory::StateTracker;

fn observe_at(state: &WorldState, agent: EntityId, tick: u64) -> Observation {
    let mut observation = state.observe(agent).unwrap();
    observation.tick = tick;
    observation
}

fn short_sighted(state: &mut WorldState, at: (i32, i32), radius: f64) -> EntityId {
    let senses = SenseCapability::none().with(TypeFilter::All, radius);
    state.insert_avatar(AvatarSpec::new(at).senses(senses)).unwrap()
}

#[test]
fn unseen_entities_fade_out_after_ceil_one_over_rate_ticks() {
    let mut state = WorldState::new(GridShape::new(10, 1));
    let agent = short_sighted(&mut state, (0, 0), 2.0);
    let wall = state.insert_object(ObjectSpec::wall((1, 0))).unwrap();
    let mut tracker = StateTracker::new(agent, 0.3);

    let first = tracker.update(&observe_at(&state, agent, 0));
    assert_eq!(first.refreshed, vec![wall]);
    assert_eq!(tracker.confidence(wall), Some(1.0));

    state.relocate(agent, Location::new(6, 0)).unwrap();
    for tick in 1..4 {
        let update = tracker.update(&observe_at(&state, agent, tick));
        assert!(update.expired.is_empty(), "tick {tick}");
        assert!(tracker.contains(wall), "tick {tick}");
    }
    let update = tracker.update(&observe_at(&state, agent, 4));
    assert_eq!(update.expired, vec![wall]);
    assert!(!tracker.contains(wall));
}

#[test]
fn exact_reciprocal_rates_forget_on_the_boundary_tick() {
    let mut state = WorldState::new(GridShape::new(10, 1));
    let agent = short_sighted(&mut state, (0, 0), 1.0);
    let wall = state.insert_object(ObjectSpec::wall((1, 0))).unwrap();
    let mut tracker = StateTracker::new(agent, 10.0);

    tracker.update(&observe_at(&state, agent, 0));
    state.relocate(agent, Location::new(9, 0)).unwrap();
    for tick in 1..10 {
        tracker.update(&observe_at(&state, agent, tick));
        assert!(tracker.contains(wall), "tick {tick}");
    }
    tracker.update(&observe_at(&state, agent, 10));
    assert!(!tracker.contains(wall));
}

#[test]
fn decay_is_charged_per_elapsed_tick() {
    let mut state = WorldState::new(GridShape::new(10, 1));
    let agent = short_sighted(&mut state, (0, 0), 1.0);
    let wall = state.insert_object(ObjectSpec::wall((1, 0))).unwrap();
    let mut tracker = StateTracker::new(agent, 0.25);

    tracker.update(&observe_at(&state, agent, 0));
    state.relocate(agent, Location::new(5, 0)).unwrap();
    tracker.update(&observe_at(&state, agent, 2));
    assert_eq!(tracker.confidence(wall), Some(0.5));
    let update = tracker.update(&observe_at(&state, agent, 4));
    assert_eq!(update.expired, vec![wall]);
}

#[test]
fn missing_from_view_while_in_range_means_gone() {
    let mut state = WorldState::new(GridShape::new(5, 5));
    let agent = short_sighted(&mut state, (2, 2), 2.0);
    let block = state.insert_object(ObjectSpec::block((3, 3))).unwrap();
    let mut tracker = StateTracker::new(agent, 0.0);

    tracker.update(&observe_at(&state, agent, 0));
    assert!(tracker.contains(block));

    state.remove(block).unwrap();
    let update = tracker.update(&observe_at(&state, agent, 1));
    assert_eq!(update.confirmed_gone, vec![block]);
    assert!(update.expired.is_empty());
    assert!(!tracker.contains(block));
}

#[test]
fn out_of_range_memories_survive_and_refresh_on_return() {
    let mut state = WorldState::new(GridShape::new(10, 1));
    let agent = short_sighted(&mut state, (0, 0), 1.5);
    let wall = state.insert_object(ObjectSpec::wall((1, 0))).unwrap();
    let mut tracker = StateTracker::new(agent, 0.2);

    tracker.update(&observe_at(&state, agent, 0));
    state.relocate(agent, Location::new(5, 0)).unwrap();
    tracker.update(&observe_at(&state, agent, 1));
    tracker.update(&observe_at(&state, agent, 2));
    let faded = tracker.confidence(wall).unwrap();
    assert!((faded - 0.6).abs() < 1e-9);

    state.relocate(agent, Location::new(2, 0)).unwrap();
    let update = tracker.update(&observe_at(&state, agent, 3));
    assert_eq!(update.refreshed, vec![wall]);
    assert_eq!(tracker.confidence(wall), Some(1.0));
    assert_eq!(tracker.get(wall).unwrap().last_seen, 3);
}

#[test]
fn purge_uses_the_range_for_the_remembered_kind() {
    let mut state = WorldState::new(GridShape::new(10, 1));
    let senses = SenseCapability::none()
        .with(TypeFilter::Kind(ObjectKind::Wall), 1.0)
        .with(TypeFilter::Avatars, 6.0);
    let agent = state
        .insert_avatar(AvatarSpec::new((0, 0)).senses(senses))
        .unwrap();
    let wall = state.insert_object(ObjectSpec::wall((1, 0))).unwrap();
    let mut tracker = StateTracker::new(agent, 0.0);
    tracker.update(&observe_at(&state, agent, 0));

    // Three cells away: beyond wall range, inside avatar range.
    state.relocate(agent, Location::new(4, 0)).unwrap();
    let update = tracker.update(&observe_at(&state, agent, 1));
    assert!(update.confirmed_gone.is_empty());
    assert!(tracker.contains(wall));
}

#[test]
fn traversability_map_reflects_remembered_obstacles() {
    let mut state = WorldState::new(GridShape::new(4, 4));
    let agent = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    state.insert_object(ObjectSpec::wall((1, 1))).unwrap();
    state.insert_object(ObjectSpec::door((2, 2), true)).unwrap();
    state.insert_object(ObjectSpec::door((3, 3), false)).unwrap();
    let block = state.insert_object(ObjectSpec::block((1, 0))).unwrap();
    state.insert_avatar(AvatarSpec::new((0, 3))).unwrap();
    state.attach(agent, block).unwrap();

    let mut tracker = StateTracker::new(agent, 0.1);
    assert_eq!(tracker.traversability_map().shape(), GridShape::new(0, 0));
    tracker.update(&observe_at(&state, agent, 0));

    let map = tracker.traversability_map();
    assert_eq!(map.shape(), GridShape::new(4, 4));
    let blocked: Vec<_> = map.blocked_cells().collect();
    assert_eq!(
        blocked,
        vec![Location::new(1, 1), Location::new(0, 3), Location::new(3, 3)]
    );
    assert!(map.is_traversable(Location::new(0, 0)));
    assert!(map.is_traversable(Location::new(2, 2)));
    assert!(!map.is_traversable(Location::new(4, 0)));
}

#[test]
fn own_snapshot_and_grid_are_kept() {
    let mut state = WorldState::new(GridShape::new(3, 3));
    let agent = state.insert_avatar(AvatarSpec::new((1, 2))).unwrap();
    let mut tracker = StateTracker::new(agent, 0.5);
    assert!(tracker.own().is_none());

    tracker.update(&observe_at(&state, agent, 7));
    assert_eq!(tracker.own().unwrap().location, Location::new(1, 2));
    assert_eq!(tracker.grid(), Some(GridShape::new(3, 3)));
    assert_eq!(tracker.last_tick(), Some(7));
    assert!(tracker.is_empty());
}

#[test]
fn remembered_entries_serialize_for_inspection() {
    let mut state = WorldState::new(GridShape::new(3, 1));
    let agent = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let wall = state.insert_object(ObjectSpec::wall((2, 0))).unwrap();
    let mut tracker = StateTracker::new(agent, 0.5);
    tracker.update(&observe_at(&state, agent, 3));

    let entries: Vec<_> = tracker.remembered().collect();
    let json = serde_json::to_value(&entries).unwrap();
    assert_eq!(json[0]["snapshot"]["id"], wall.raw());
    assert_eq!(json[0]["snapshot"]["location"], serde_json::json!({"x": 2, "y": 0}));
    assert_eq!(json[0]["confidence"], 1.0);
    assert_eq!(json[0]["last_seen"], 3);
}

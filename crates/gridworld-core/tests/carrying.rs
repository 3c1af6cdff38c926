use serde_json::json;

use gridworld_core::properties::IS_MOVABLE;
use gridworld_core::{
    ActionArgs, ActionFailure, ActionKind, ActionRegistry, ActionResult, AvatarSpec, EntityId,
    GridShape, Location, ObjectSpec, WorldError, WorldState,
};

fn apply(
    registry: &ActionRegistry,
    state: &mut WorldState,
    actor: EntityId,
    kind: ActionKind,
    args: ActionArgs,
) -> ActionResult {
    let action = registry.get(kind).unwrap();
    match action.is_possible(state, actor, &args) {
        Ok(()) => action.mutate(state, actor, &args),
        Err(failure) => failure.into(),
    }
}

#[test]
fn carried_block_follows_its_holder_and_leaves_the_grid() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(5, 5));
    let agent = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let block = state.insert_object(ObjectSpec::block((1, 0))).unwrap();

    let grabbed = apply(&registry, &mut state, agent, ActionKind::GrabObject, ActionArgs::target(block));
    assert!(grabbed.succeeded, "{}", grabbed.message);
    assert_eq!(state.location_of(block), Some(Location::new(0, 0)));
    assert!(state.grid().occupants(Location::new(1, 0)).is_empty());
    assert_eq!(state.grid().occupants(Location::new(0, 0)), &[agent]);

    let moved = apply(&registry, &mut state, agent, ActionKind::MoveEast, ActionArgs::new());
    assert!(moved.succeeded);
    assert_eq!(state.location_of(block), Some(Location::new(1, 0)));
    assert_eq!(state.grid().occupants(Location::new(1, 0)), &[agent]);
    assert!(state.occupancy_violations().is_empty());

    // Both are intraversable, so the block lands on the nearest free cell.
    let dropped = apply(&registry, &mut state, agent, ActionKind::DropObject, ActionArgs::new());
    assert!(dropped.succeeded);
    assert_eq!(state.location_of(block), Some(Location::new(0, 0)));
    assert_eq!(state.grid().occupants(Location::new(0, 0)), &[block]);
    assert!(state.get(block).unwrap().carried_by().is_empty());
    assert!(state.get(agent).unwrap().avatar().unwrap().carrying().is_empty());
}

#[test]
fn traversable_item_is_dropped_on_the_holders_cell() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(3, 3));
    let agent = state.insert_avatar(AvatarSpec::new((1, 1))).unwrap();
    let token = state
        .insert_object(ObjectSpec::area((1, 2)).named("token").movable(true))
        .unwrap();

    apply(&registry, &mut state, agent, ActionKind::GrabObject, ActionArgs::target(token));
    apply(&registry, &mut state, agent, ActionKind::MoveNorth, ActionArgs::new());
    let dropped = apply(&registry, &mut state, agent, ActionKind::DropObject, ActionArgs::target(token));
    assert!(dropped.succeeded);
    assert_eq!(state.location_of(token), Some(Location::new(1, 0)));
    assert_eq!(state.grid().occupants(Location::new(1, 0)), &[agent, token]);
}

#[test]
fn grab_reports_why_it_failed() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(5, 5));
    let agent = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let block = state.insert_object(ObjectSpec::block((1, 0))).unwrap();
    let wall = state.insert_object(ObjectSpec::wall((0, 1))).unwrap();
    let far = state.insert_object(ObjectSpec::block((3, 3))).unwrap();
    let rival = state.insert_avatar(AvatarSpec::new((1, 1))).unwrap();
    let grab = |state: &mut WorldState, actor, args| {
        apply(&registry, state, actor, ActionKind::GrabObject, args).failure
    };

    assert_eq!(grab(&mut state, agent, ActionArgs::new()), Some(ActionFailure::NoObjectSpecified));
    assert_eq!(
        grab(&mut state, agent, ActionArgs::target(EntityId(99))),
        Some(ActionFailure::ObjectNotFound(EntityId(99)))
    );
    assert_eq!(grab(&mut state, agent, ActionArgs::target(agent)), Some(ActionFailure::CannotGrabSelf));
    assert_eq!(grab(&mut state, agent, ActionArgs::target(far)), Some(ActionFailure::NotInRange));
    assert_eq!(grab(&mut state, agent, ActionArgs::target(wall)), Some(ActionFailure::ObjectNotMovable));
    assert_eq!(
        grab(&mut state, agent, ActionArgs::target(far).with(ActionArgs::GRAB_RANGE, 0.0)),
        None
    );

    assert_eq!(grab(&mut state, agent, ActionArgs::target(block)), None);
    assert_eq!(
        grab(&mut state, rival, ActionArgs::target(block)),
        Some(ActionFailure::ObjectAlreadyCarried)
    );
}

#[test]
fn drop_reports_why_it_failed() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(2, 1));
    let agent = state
        .insert_avatar(AvatarSpec::new((0, 0)).traversable(true))
        .unwrap();
    let first = state.insert_object(ObjectSpec::block((0, 0))).unwrap();
    state.insert_object(ObjectSpec::wall((1, 0))).unwrap();

    let release = |state: &mut WorldState, args| {
        apply(&registry, state, agent, ActionKind::DropObject, args).failure
    };
    assert_eq!(release(&mut state, ActionArgs::new()), Some(ActionFailure::NothingCarried));

    apply(&registry, &mut state, agent, ActionKind::GrabObject, ActionArgs::target(first));
    let second = state.insert_object(ObjectSpec::block((0, 0))).unwrap();
    assert_eq!(
        release(&mut state, ActionArgs::target(second)),
        Some(ActionFailure::NotCarrying(second))
    );
    assert_eq!(
        release(&mut state, ActionArgs::new()),
        Some(ActionFailure::DropLocationOccupied)
    );
}

#[test]
fn removing_a_holder_removes_what_it_carries() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(3, 1));
    let holder = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let block = state.insert_object(ObjectSpec::block((1, 0))).unwrap();
    let remover = state.insert_avatar(AvatarSpec::new((2, 0))).unwrap();

    apply(&registry, &mut state, holder, ActionKind::GrabObject, ActionArgs::target(block));
    assert_eq!(
        apply(&registry, &mut state, remover, ActionKind::RemoveObject, ActionArgs::target(holder)).failure,
        Some(ActionFailure::NotInRange)
    );
    assert_eq!(
        apply(&registry, &mut state, remover, ActionKind::RemoveObject, ActionArgs::target(remover)).failure,
        Some(ActionFailure::CannotRemoveSelf)
    );

    let args = ActionArgs::target(holder).with(ActionArgs::REMOVE_RANGE, 2.0);
    let removed = apply(&registry, &mut state, remover, ActionKind::RemoveObject, args);
    assert!(removed.succeeded);
    assert!(!state.contains(holder));
    assert!(!state.contains(block));
    assert!(state.grid().occupants(Location::new(0, 0)).is_empty());
    assert_eq!(state.store().agents(), &[remover]);
}

#[test]
fn removing_a_carried_item_unlinks_it_from_the_holder() {
    let mut state = WorldState::new(GridShape::new(2, 1));
    let holder = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let block = state.insert_object(ObjectSpec::block((1, 0))).unwrap();
    state.attach(holder, block).unwrap();

    assert_eq!(state.remove(block).unwrap(), vec![block]);
    assert!(state.get(holder).unwrap().avatar().unwrap().carrying().is_empty());
    assert!(state.grid().occupants(Location::new(1, 0)).is_empty());
}

fn movable_agent(state: &mut WorldState, at: (i32, i32)) -> EntityId {
    let agent = state
        .insert_avatar(AvatarSpec::new(at).writable(IS_MOVABLE))
        .unwrap();
    let mut props = state.get(agent).unwrap().property_map();
    props.insert(IS_MOVABLE.into(), json!(true));
    state.apply_agent_properties(agent, &props).unwrap();
    agent
}

#[test]
fn agents_cannot_grab_whoever_is_carrying_them() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(3, 3));
    let first = movable_agent(&mut state, (0, 0));
    let second = movable_agent(&mut state, (1, 0));
    let third = movable_agent(&mut state, (0, 1));
    let grab = |state: &mut WorldState, actor, object| {
        apply(&registry, state, actor, ActionKind::GrabObject, ActionArgs::target(object)).failure
    };

    assert_eq!(grab(&mut state, first, second), None);
    assert_eq!(grab(&mut state, second, first), Some(ActionFailure::CannotGrabHolder));
    assert_eq!(grab(&mut state, second, third), None);
    assert_eq!(grab(&mut state, third, first), Some(ActionFailure::CannotGrabHolder));
    assert_eq!(
        state.attach(third, first),
        Err(WorldError::CarryCycle {
            holder: third,
            item: first
        })
    );
    assert!(matches!(state.attach(first, first), Err(WorldError::CarryCycle { .. })));

    let moved = apply(&registry, &mut state, first, ActionKind::MoveEast, ActionArgs::new());
    assert!(moved.succeeded);
    for id in [first, second, third] {
        assert_eq!(state.location_of(id), Some(Location::new(1, 0)));
    }
    assert_eq!(state.grid().occupants(Location::new(1, 0)), &[first]);
}

#[test]
fn huge_drop_ranges_still_pick_the_nearest_free_cell() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(10, 1));
    let agent = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let block = state.insert_object(ObjectSpec::block((1, 0))).unwrap();
    apply(&registry, &mut state, agent, ActionKind::GrabObject, ActionArgs::target(block));
    for x in 1..=6 {
        state.insert_object(ObjectSpec::wall((x, 0))).unwrap();
    }

    for range in [1e12, f64::MAX, 0.0] {
        let args = ActionArgs::new().with(ActionArgs::DROP_RANGE, range);
        let dropped = apply(&registry, &mut state, agent, ActionKind::DropObject, args);
        assert!(dropped.succeeded, "drop_range {range}");
        assert_eq!(state.location_of(block), Some(Location::new(7, 0)));
        state.attach(agent, block).unwrap();
    }
}

#[test]
fn huge_drop_ranges_fail_cleanly_when_the_grid_is_full() {
    let registry = ActionRegistry::builtin();
    let mut state = WorldState::new(GridShape::new(2, 1));
    let agent = state.insert_avatar(AvatarSpec::new((0, 0))).unwrap();
    let block = state.insert_object(ObjectSpec::block((1, 0))).unwrap();
    apply(&registry, &mut state, agent, ActionKind::GrabObject, ActionArgs::target(block));
    state.insert_object(ObjectSpec::wall((1, 0))).unwrap();

    for range in [1e12, 0.0] {
        let args = ActionArgs::new().with(ActionArgs::DROP_RANGE, range);
        assert_eq!(
            apply(&registry, &mut state, agent, ActionKind::DropObject, args).failure,
            Some(ActionFailure::DropLocationOccupied)
        );
    }
    assert_eq!(state.get(agent).unwrap().avatar().unwrap().carrying(), &[block]);
}

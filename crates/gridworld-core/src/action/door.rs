use crate::action::in_range;
use crate::{
    Action, ActionArgs, ActionFailure, ActionKind, ActionResult, EntityId, SenseRange, WorldState,
};

fn target_door(
    world: &WorldState,
    actor: EntityId,
    args: &ActionArgs,
) -> Result<(EntityId, bool), ActionFailure> {
    let door = args.object_id().ok_or(ActionFailure::NoObjectSpecified)?;
    let open = world
        .get(door)
        .and_then(|e| e.door_open())
        .ok_or(ActionFailure::NotADoor)?;
    let range = args.range(ActionArgs::DOOR_RANGE, SenseRange::Unlimited);
    if !in_range(world, actor, door, range) {
        return Err(ActionFailure::NotInRange);
    }
    Ok((door, open))
}

fn door_is_blocked(world: &WorldState, door: EntityId) -> bool {
    world
        .location_of(door)
        .is_some_and(|cell| world.grid().occupants(cell).iter().any(|id| *id != door))
}

/// Opens a closed door given by `object_id`, within `door_range` (default
/// unlimited).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenDoor;

impl OpenDoor {
    pub const SUCCESS: &'static str = "The door was successfully opened.";
}

impl Action for OpenDoor {
    fn kind(&self) -> ActionKind {
        ActionKind::OpenDoor
    }

    fn is_possible(
        &self,
        world: &WorldState,
        actor: EntityId,
        args: &ActionArgs,
    ) -> Result<(), ActionFailure> {
        let (_, open) = target_door(world, actor, args)?;
        if open {
            return Err(ActionFailure::DoorAlreadyOpen);
        }
        Ok(())
    }

    fn is_feasible(&self, world: &WorldState, _actor: EntityId) -> bool {
        world.store().objects().any(|e| e.door_open() == Some(false))
    }

    fn mutate(&self, world: &mut WorldState, _actor: EntityId, args: &ActionArgs) -> ActionResult {
        let Some(door) = args.object_id() else {
            return ActionFailure::NoObjectSpecified.into();
        };
        world.set_door_open(door, true);
        ActionResult::success(Self::SUCCESS)
    }
}

/// Closes an open door given by `object_id`. Fails while anything stands in
/// the doorway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseDoor;

impl CloseDoor {
    pub const SUCCESS: &'static str = "The door was successfully closed.";
}

impl Action for CloseDoor {
    fn kind(&self) -> ActionKind {
        ActionKind::CloseDoor
    }

    fn is_possible(
        &self,
        world: &WorldState,
        actor: EntityId,
        args: &ActionArgs,
    ) -> Result<(), ActionFailure> {
        let (door, open) = target_door(world, actor, args)?;
        if !open {
            return Err(ActionFailure::DoorAlreadyClosed);
        }
        if door_is_blocked(world, door) {
            return Err(ActionFailure::DoorBlocked);
        }
        Ok(())
    }

    fn is_feasible(&self, world: &WorldState, _actor: EntityId) -> bool {
        world
            .store()
            .objects()
            .any(|e| e.door_open() == Some(true) && !door_is_blocked(world, e.id()))
    }

    fn mutate(&self, world: &mut WorldState, _actor: EntityId, args: &ActionArgs) -> ActionResult {
        let Some(door) = args.object_id() else {
            return ActionFailure::NoObjectSpecified.into();
        };
        world.set_door_open(door, false);
        ActionResult::success(Self::SUCCESS)
    }
}

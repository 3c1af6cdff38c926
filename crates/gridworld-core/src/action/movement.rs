use crate::{
    Action, ActionArgs, ActionFailure, ActionKind, ActionResult, Direction, EntityId, WorldState,
};

/// One step in a compass direction. Carried entities follow the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    direction: Direction,
    duration_in_ticks: u64,
}

impl Move {
    pub const SUCCESS: &'static str = "Move action success";

    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            duration_in_ticks: 1,
        }
    }

    pub fn with_duration(mut self, ticks: u64) -> Self {
        self.duration_in_ticks = ticks.max(1);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Action for Move {
    fn kind(&self) -> ActionKind {
        match self.direction {
            Direction::North => ActionKind::MoveNorth,
            Direction::NorthEast => ActionKind::MoveNorthEast,
            Direction::East => ActionKind::MoveEast,
            Direction::SouthEast => ActionKind::MoveSouthEast,
            Direction::South => ActionKind::MoveSouth,
            Direction::SouthWest => ActionKind::MoveSouthWest,
            Direction::West => ActionKind::MoveWest,
            Direction::NorthWest => ActionKind::MoveNorthWest,
        }
    }

    fn duration_in_ticks(&self) -> u64 {
        self.duration_in_ticks
    }

    fn is_possible(
        &self,
        world: &WorldState,
        actor: EntityId,
        _args: &ActionArgs,
    ) -> Result<(), ActionFailure> {
        let origin = world.location_of(actor).ok_or(ActionFailure::AgentRemoved)?;
        let (dx, dy) = self.direction.delta();
        let target = origin.offset(dx, dy);
        if !world.shape().contains(target) {
            return Err(ActionFailure::OutOfBounds);
        }

        for occupant in world.grid().occupants(target) {
            let Some(entity) = world.get(*occupant) else {
                continue;
            };
            if entity.is_avatar() {
                if *occupant == actor {
                    return Err(ActionFailure::NoMove);
                }
                if !entity.traversable {
                    return Err(ActionFailure::Occupied);
                }
            } else if !entity.traversable {
                return Err(ActionFailure::NotPassableObject);
            }
        }
        Ok(())
    }

    fn mutate(&self, world: &mut WorldState, actor: EntityId, _args: &ActionArgs) -> ActionResult {
        let Some(origin) = world.location_of(actor) else {
            return ActionFailure::AgentRemoved.into();
        };
        let (dx, dy) = self.direction.delta();
        match world.relocate(actor, origin.offset(dx, dy)) {
            Ok(()) => ActionResult::success(Self::SUCCESS),
            Err(_) => ActionFailure::NotPossible.into(),
        }
    }
}

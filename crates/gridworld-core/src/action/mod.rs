//! The two-phase action protocol and the built-in action catalogue.

mod carry;
mod door;
mod movement;
mod remove;

use std::collections::BTreeMap;
use std::str::FromStr;

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{ActionSet, EntityId, SenseRange, WorldState};

pub use carry::{DropObject, GrabObject};
pub use door::{CloseDoor, OpenDoor};
pub use movement::Move;
pub use remove::RemoveObject;

/// Compass direction of a move. North is `y - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }
}

/// The closed catalogue of action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    MoveNorth,
    MoveNorthEast,
    MoveEast,
    MoveSouthEast,
    MoveSouth,
    MoveSouthWest,
    MoveWest,
    MoveNorthWest,
    OpenDoor,
    CloseDoor,
    GrabObject,
    DropObject,
    RemoveObject,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        ActionKind::MoveNorth,
        ActionKind::MoveNorthEast,
        ActionKind::MoveEast,
        ActionKind::MoveSouthEast,
        ActionKind::MoveSouth,
        ActionKind::MoveSouthWest,
        ActionKind::MoveWest,
        ActionKind::MoveNorthWest,
        ActionKind::OpenDoor,
        ActionKind::CloseDoor,
        ActionKind::GrabObject,
        ActionKind::DropObject,
        ActionKind::RemoveObject,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::MoveNorth => "MoveNorth",
            ActionKind::MoveNorthEast => "MoveNorthEast",
            ActionKind::MoveEast => "MoveEast",
            ActionKind::MoveSouthEast => "MoveSouthEast",
            ActionKind::MoveSouth => "MoveSouth",
            ActionKind::MoveSouthWest => "MoveSouthWest",
            ActionKind::MoveWest => "MoveWest",
            ActionKind::MoveNorthWest => "MoveNorthWest",
            ActionKind::OpenDoor => "OpenDoor",
            ActionKind::CloseDoor => "CloseDoor",
            ActionKind::GrabObject => "GrabObject",
            ActionKind::DropObject => "DropObject",
            ActionKind::RemoveObject => "RemoveObject",
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            ActionKind::MoveNorth => Some(Direction::North),
            ActionKind::MoveNorthEast => Some(Direction::NorthEast),
            ActionKind::MoveEast => Some(Direction::East),
            ActionKind::MoveSouthEast => Some(Direction::SouthEast),
            ActionKind::MoveSouth => Some(Direction::South),
            ActionKind::MoveSouthWest => Some(Direction::SouthWest),
            ActionKind::MoveWest => Some(Direction::West),
            ActionKind::MoveNorthWest => Some(Direction::NorthWest),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = ActionFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ActionFailure::UnknownAction(s.to_string()))
    }
}

/// Keyword arguments of an action request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionArgs(pub BTreeMap<String, Value>);

impl ActionArgs {
    pub const OBJECT_ID: &'static str = "object_id";
    pub const DOOR_RANGE: &'static str = "door_range";
    pub const GRAB_RANGE: &'static str = "grab_range";
    pub const DROP_RANGE: &'static str = "drop_range";
    pub const REMOVE_RANGE: &'static str = "remove_range";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn target(object: EntityId) -> Self {
        Self::new().with(Self::OBJECT_ID, object.raw())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn object_id(&self) -> Option<EntityId> {
        self.get(Self::OBJECT_ID).and_then(Value::as_u64).map(EntityId)
    }

    /// A range argument, `default` when absent. Non-positive means unlimited.
    pub fn range(&self, key: &str, default: SenseRange) -> SenseRange {
        self.get(key)
            .and_then(Value::as_f64)
            .map(SenseRange::from_radius)
            .unwrap_or(default)
    }
}

/// Why an action did not happen. `Display` is the result message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ActionFailure {
    #[error("Move action out of bounds")]
    OutOfBounds,
    #[error("Move action towards occupied space")]
    Occupied,
    #[error("Move action resulted in a new location with the agent already present.")]
    NoMove,
    #[error("Move action toward space which is not traversable by agent due object")]
    NotPassableObject,
    #[error("No object_id specified.")]
    NoObjectSpecified,
    #[error("Object {0} does not exist")]
    ObjectNotFound(EntityId),
    #[error("Door action could not be performed, as object isn't a door")]
    NotADoor,
    #[error("Object was not in range")]
    NotInRange,
    #[error("Can't open door, door is already open")]
    DoorAlreadyOpen,
    #[error("Can't close door, door is already closed")]
    DoorAlreadyClosed,
    #[error("Can't close door, something is in the doorway")]
    DoorBlocked,
    #[error("An agent cannot grab itself")]
    CannotGrabSelf,
    #[error("An agent cannot grab something that is carrying it")]
    CannotGrabHolder,
    #[error("Object is not movable")]
    ObjectNotMovable,
    #[error("Object is already being carried")]
    ObjectAlreadyCarried,
    #[error("Agent is not carrying anything")]
    NothingCarried,
    #[error("Agent is not carrying object {0}")]
    NotCarrying(EntityId),
    #[error("No free location to drop the object")]
    DropLocationOccupied,
    #[error("An agent cannot remove itself")]
    CannotRemoveSelf,
    #[error("The agent is not capable of this action")]
    AgentNotCapable,
    #[error("The action `{0}` is not known to the environment")]
    UnknownAction(String),
    #[error("The agent was removed before its action could be applied")]
    AgentRemoved,
    #[error("The action was not possible")]
    NotPossible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub message: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ActionFailure>,
}

impl ActionResult {
    pub const NO_ACTION_GIVEN: &'static str =
        "There was no action given to perform, automatic succeed.";

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            succeeded: true,
            failure: None,
        }
    }

    pub fn failed(failure: ActionFailure) -> Self {
        Self {
            message: failure.to_string(),
            succeeded: false,
            failure: Some(failure),
        }
    }

    pub fn no_action() -> Self {
        Self::success(Self::NO_ACTION_GIVEN)
    }
}

impl From<ActionFailure> for ActionResult {
    fn from(failure: ActionFailure) -> Self {
        Self::failed(failure)
    }
}

/// One action kind's feasibility test and world mutation.
///
/// `is_possible` must not change the world. `mutate` is only called after
/// `is_possible` returned `Ok`.
pub trait Action: 'static {
    fn kind(&self) -> ActionKind;

    /// Length of the actor's busy window.
    fn duration_in_ticks(&self) -> u64 {
        1
    }

    fn is_possible(
        &self,
        world: &WorldState,
        actor: EntityId,
        args: &ActionArgs,
    ) -> Result<(), ActionFailure>;

    /// Whether some instantiation of the action could succeed right now.
    fn is_feasible(&self, world: &WorldState, actor: EntityId) -> bool {
        self.is_possible(world, actor, &ActionArgs::default()).is_ok()
    }

    fn mutate(&self, world: &mut WorldState, actor: EntityId, args: &ActionArgs) -> ActionResult;
}

/// Statically declared mapping from [`ActionKind`] to implementation.
pub struct ActionRegistry {
    actions: BTreeMap<ActionKind, Box<dyn Action>>,
}

impl ActionRegistry {
    pub fn empty() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    /// All built-in actions with their default durations.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in ActionKind::ALL {
            if let Some(direction) = kind.direction() {
                registry.register(Move::new(direction));
            }
        }
        registry.register(OpenDoor::default());
        registry.register(CloseDoor::default());
        registry.register(GrabObject::default());
        registry.register(DropObject::default());
        registry.register(RemoveObject::default());
        registry
    }

    /// Installs `action` for its kind, returning the one it replaces.
    pub fn register(&mut self, action: impl Action) -> Option<Box<dyn Action>> {
        self.actions.insert(action.kind(), Box::new(action))
    }

    pub fn get(&self, kind: ActionKind) -> Option<&dyn Action> {
        self.actions.get(&kind).map(|a| a.as_ref())
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.actions.contains_key(&kind)
    }

    /// Maps a requested action name to a registered kind.
    pub fn resolve(&self, name: &str) -> Result<ActionKind, ActionFailure> {
        let kind: ActionKind = name.parse()?;
        if self.contains(kind) {
            Ok(kind)
        } else {
            Err(ActionFailure::UnknownAction(name.to_string()))
        }
    }

    /// Registered kinds in `allowed` that `actor` could perform right now.
    pub fn feasible(&self, world: &WorldState, actor: EntityId, allowed: &ActionSet) -> Vec<ActionKind> {
        self.actions
            .iter()
            .filter(|(kind, _)| allowed.contains(**kind))
            .filter(|(_, action)| action.is_feasible(world, actor))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.actions.keys()).finish()
    }
}

/// Distance check shared by the targeted actions.
fn in_range(world: &WorldState, actor: EntityId, target: EntityId, range: SenseRange) -> bool {
    match (world.location_of(actor), world.location_of(target)) {
        (Some(a), Some(b)) => range.contains(a.distance(b)),
        _ => false,
    }
}

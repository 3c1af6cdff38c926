use std::collections::BTreeSet;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::properties::{self, PropertyMap};
use crate::{ActionKind, EntityId, Location, SenseCapability};

/// Appearance colour of an open door.
pub const DOOR_OPEN_COLOUR: &str = "#9c9c9c";
/// Appearance colour of a closed door.
pub const DOOR_CLOSED_COLOUR: &str = "#5b3a29";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Wall,
    Door,
    Block,
    Area,
    Custom(String),
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Wall => f.write_str("wall"),
            ObjectKind::Door => f.write_str("door"),
            ObjectKind::Block => f.write_str("block"),
            ObjectKind::Area => f.write_str("area"),
            ObjectKind::Custom(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Avatar,
    Object(ObjectKind),
}

impl EntityKind {
    pub fn is_avatar(&self) -> bool {
        matches!(self, EntityKind::Avatar)
    }

    pub fn object_kind(&self) -> Option<&ObjectKind> {
        match self {
            EntityKind::Object(kind) => Some(kind),
            EntityKind::Avatar => None,
        }
    }

    pub fn is_door(&self) -> bool {
        matches!(self, EntityKind::Object(ObjectKind::Door))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Avatar => f.write_str("avatar"),
            EntityKind::Object(kind) => fmt::Display::fmt(kind, f),
        }
    }
}

/// The action kinds an avatar may attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionSet {
    #[default]
    All,
    Only(BTreeSet<ActionKind>),
}

impl ActionSet {
    pub fn only(kinds: impl IntoIterator<Item = ActionKind>) -> Self {
        ActionSet::Only(kinds.into_iter().collect())
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        match self {
            ActionSet::All => true,
            ActionSet::Only(kinds) => kinds.contains(&kind),
        }
    }

    /// Assigned kinds in canonical order.
    pub fn kinds(&self) -> Vec<ActionKind> {
        match self {
            ActionSet::All => ActionKind::ALL.to_vec(),
            ActionSet::Only(kinds) => kinds.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAction {
    pub started_tick: u64,
    pub duration_in_ticks: u64,
}

/// Engine-side record of an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub senses: SenseCapability,
    pub actions: ActionSet,
    pub team: String,
    /// Minimum number of ticks between two actions; at least 1.
    pub speed_in_ticks: u64,
    pub human_controlled: bool,
    pub(crate) carrying: Vec<EntityId>,
    pub(crate) last_action: Option<LastAction>,
    pub(crate) writable: BTreeSet<String>,
}

impl Avatar {
    pub fn carrying(&self) -> &[EntityId] {
        &self.carrying
    }

    pub fn last_action(&self) -> Option<LastAction> {
        self.last_action
    }

    pub fn writable(&self) -> &BTreeSet<String> {
        &self.writable
    }

    /// First tick at which the avatar may act again. Saturates at
    /// `u64::MAX`, which keeps the avatar busy for the rest of the run.
    pub fn ready_at(&self) -> u64 {
        match self.last_action {
            Some(last) => last
                .started_tick
                .saturating_add(last.duration_in_ticks.max(self.speed_in_ticks)),
            None => 0,
        }
    }

    pub fn is_busy(&self, tick: u64) -> bool {
        tick < self.ready_at()
    }
}

/// A static object or an avatar. Owned exclusively by the
/// [`EntityStore`](crate::EntityStore); location and carrying links change only
/// through [`WorldState`](crate::WorldState).
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    location: Location,
    carried_by: BTreeSet<EntityId>,
    pub name: String,
    pub traversable: bool,
    pub movable: bool,
    /// Extension map for custom, non-mandatory fields.
    pub properties: PropertyMap,
    avatar: Option<Avatar>,
}

impl Entity {
    pub(crate) fn from_object(id: EntityId, spec: ObjectSpec) -> Self {
        Self {
            id,
            kind: EntityKind::Object(spec.kind),
            location: spec.location,
            carried_by: BTreeSet::new(),
            name: spec.name,
            traversable: spec.traversable,
            movable: spec.movable,
            properties: spec.properties,
            avatar: None,
        }
    }

    pub(crate) fn from_avatar(id: EntityId, spec: AvatarSpec) -> Self {
        let team = spec.team.unwrap_or_else(|| id.to_string());
        Self {
            id,
            kind: EntityKind::Avatar,
            location: spec.location,
            carried_by: BTreeSet::new(),
            name: spec.name,
            traversable: spec.traversable,
            movable: false,
            properties: spec.properties,
            avatar: Some(Avatar {
                senses: spec.senses,
                actions: spec.actions,
                team,
                speed_in_ticks: spec.speed_in_ticks.max(1),
                human_controlled: spec.human_controlled,
                carrying: Vec::new(),
                last_action: None,
                writable: spec.writable,
            }),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub fn carried_by(&self) -> &BTreeSet<EntityId> {
        &self.carried_by
    }

    pub(crate) fn carried_by_mut(&mut self) -> &mut BTreeSet<EntityId> {
        &mut self.carried_by
    }

    pub fn is_carried(&self) -> bool {
        !self.carried_by.is_empty()
    }

    pub fn is_avatar(&self) -> bool {
        self.avatar.is_some()
    }

    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.as_ref()
    }

    pub(crate) fn avatar_mut(&mut self) -> Option<&mut Avatar> {
        self.avatar.as_mut()
    }

    /// `is_open` of a door; `None` for anything else.
    pub fn door_open(&self) -> Option<bool> {
        if !self.kind.is_door() {
            return None;
        }
        Some(
            self.properties
                .get(properties::IS_OPEN)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
        )
    }

    pub(crate) fn set_door_open(&mut self, open: bool) {
        let colour = if open {
            DOOR_OPEN_COLOUR
        } else {
            DOOR_CLOSED_COLOUR
        };
        self.properties
            .insert(properties::IS_OPEN.to_string(), open.into());
        self.properties
            .insert(properties::COLOUR.to_string(), colour.into());
        self.traversable = open;
    }

    /// Canonical, serializable view used inside observations.
    pub fn snapshot(&self, tick: u64) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind.clone(),
            location: self.location,
            traversable: self.traversable,
            movable: self.movable,
            carried_by: self.carried_by.iter().copied().collect(),
            properties: self.properties.clone(),
            avatar: self.avatar.as_ref().map(|avatar| AvatarSnapshot {
                team: avatar.team.clone(),
                speed_in_ticks: avatar.speed_in_ticks,
                human_controlled: avatar.human_controlled,
                carrying: avatar.carrying.clone(),
                actions: avatar.actions.clone(),
                senses: avatar.senses.clone(),
                busy: avatar.is_busy(tick),
            }),
        }
    }

    /// Mandatory fields and extension fields flattened into one key-sorted map.
    pub fn property_map(&self) -> PropertyMap {
        properties::flatten(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub location: Location,
    pub traversable: bool,
    pub movable: bool,
    pub carried_by: Vec<EntityId>,
    pub properties: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarSnapshot {
    pub team: String,
    pub speed_in_ticks: u64,
    pub human_controlled: bool,
    pub carrying: Vec<EntityId>,
    pub actions: ActionSet,
    pub senses: SenseCapability,
    pub busy: bool,
}

/// Registration request for a static object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSpec {
    pub name: String,
    pub kind: ObjectKind,
    pub location: Location,
    pub traversable: bool,
    pub movable: bool,
    pub properties: PropertyMap,
}

impl ObjectSpec {
    pub fn new(kind: ObjectKind, location: impl Into<Location>) -> Self {
        Self {
            name: kind.to_string(),
            kind,
            location: location.into(),
            traversable: true,
            movable: false,
            properties: PropertyMap::new(),
        }
    }

    pub fn wall(location: impl Into<Location>) -> Self {
        Self::new(ObjectKind::Wall, location).traversable(false)
    }

    pub fn block(location: impl Into<Location>) -> Self {
        Self::new(ObjectKind::Block, location)
            .traversable(false)
            .movable(true)
    }

    pub fn area(location: impl Into<Location>) -> Self {
        Self::new(ObjectKind::Area, location)
    }

    pub fn door(location: impl Into<Location>, open: bool) -> Self {
        let colour = if open {
            DOOR_OPEN_COLOUR
        } else {
            DOOR_CLOSED_COLOUR
        };
        Self::new(ObjectKind::Door, location)
            .traversable(open)
            .property(properties::IS_OPEN, open)
            .property(properties::COLOUR, colour)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn traversable(mut self, traversable: bool) -> Self {
        self.traversable = traversable;
        self
    }

    pub fn movable(mut self, movable: bool) -> Self {
        self.movable = movable;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Registration request for an avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarSpec {
    pub name: String,
    pub location: Location,
    pub traversable: bool,
    pub team: Option<String>,
    pub speed_in_ticks: u64,
    pub human_controlled: bool,
    pub senses: SenseCapability,
    pub actions: ActionSet,
    pub properties: PropertyMap,
    pub writable: BTreeSet<String>,
}

impl AvatarSpec {
    pub fn new(location: impl Into<Location>) -> Self {
        Self {
            name: "Agent".to_string(),
            location: location.into(),
            traversable: false,
            team: None,
            speed_in_ticks: 1,
            human_controlled: false,
            senses: SenseCapability::default(),
            actions: ActionSet::All,
            properties: PropertyMap::new(),
            writable: BTreeSet::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn traversable(mut self, traversable: bool) -> Self {
        self.traversable = traversable;
        self
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn speed_in_ticks(mut self, ticks: u64) -> Self {
        self.speed_in_ticks = ticks;
        self
    }

    pub fn human_controlled(mut self, human: bool) -> Self {
        self.human_controlled = human;
        self
    }

    pub fn senses(mut self, senses: SenseCapability) -> Self {
        self.senses = senses;
        self
    }

    pub fn actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Allows the decision policy to overwrite `key`.
    pub fn writable(mut self, key: impl Into<String>) -> Self {
        self.writable.insert(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_window_uses_max_of_duration_and_speed() {
        let mut entity = Entity::from_avatar(EntityId(0), AvatarSpec::new((0, 0)).speed_in_ticks(3));
        let avatar = entity.avatar_mut().unwrap();
        assert!(!avatar.is_busy(0));

        avatar.last_action = Some(LastAction {
            started_tick: 4,
            duration_in_ticks: 1,
        });
        assert!(avatar.is_busy(4));
        assert!(avatar.is_busy(6));
        assert!(!avatar.is_busy(7));

        avatar.last_action = Some(LastAction {
            started_tick: 4,
            duration_in_ticks: 5,
        });
        assert_eq!(avatar.ready_at(), 9);
    }

    #[test]
    fn busy_window_saturates_instead_of_overflowing() {
        let mut entity =
            Entity::from_avatar(EntityId(0), AvatarSpec::new((0, 0)).speed_in_ticks(u64::MAX));
        let avatar = entity.avatar_mut().unwrap();
        avatar.last_action = Some(LastAction {
            started_tick: 12,
            duration_in_ticks: 1,
        });
        assert_eq!(avatar.ready_at(), u64::MAX);
        assert!(avatar.is_busy(13));
        assert!(avatar.is_busy(u64::MAX - 1));
    }

    #[test]
    fn team_defaults_to_own_id() {
        let entity = Entity::from_avatar(EntityId(7), AvatarSpec::new((0, 0)));
        assert_eq!(entity.avatar().unwrap().team, "7");
    }

    #[test]
    fn toggling_a_door_updates_traversability_and_colour() {
        let mut door = Entity::from_object(EntityId(1), ObjectSpec::door((1, 1), false));
        assert_eq!(door.door_open(), Some(false));
        assert!(!door.traversable);

        door.set_door_open(true);
        assert_eq!(door.door_open(), Some(true));
        assert!(door.traversable);
        assert_eq!(door.properties[properties::COLOUR], DOOR_OPEN_COLOUR);
    }
}

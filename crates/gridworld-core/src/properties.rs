//! The flattened property view handed to decision policies, and validation of
//! the map they hand back.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::{ActionSet, Entity, SenseCapability, WorldError};

pub type PropertyMap = BTreeMap<String, Value>;

pub const OBJ_ID: &str = "obj_id";
pub const NAME: &str = "name";
pub const KIND: &str = "kind";
pub const LOCATION: &str = "location";
pub const IS_TRAVERSABLE: &str = "is_traversable";
pub const IS_MOVABLE: &str = "is_movable";
pub const CARRIED_BY: &str = "carried_by";
pub const TEAM: &str = "team";
pub const SPEED_IN_TICKS: &str = "speed_in_ticks";
pub const IS_HUMAN_CONTROLLED: &str = "is_human_controlled";
pub const IS_CARRYING: &str = "is_carrying";
pub const ACTION_SET: &str = "action_set";
pub const SENSE_CAPABILITY: &str = "sense_capability";

pub const IS_OPEN: &str = "is_open";
pub const COLOUR: &str = "colour";

/// Keys every avatar's property map carries.
pub const MANDATORY: [&str; 13] = [
    OBJ_ID,
    NAME,
    KIND,
    LOCATION,
    IS_TRAVERSABLE,
    IS_MOVABLE,
    CARRIED_BY,
    TEAM,
    SPEED_IN_TICKS,
    IS_HUMAN_CONTROLLED,
    IS_CARRYING,
    ACTION_SET,
    SENSE_CAPABILITY,
];

/// Keys no policy may write, whitelist or not.
pub const IMMUTABLE: [&str; 5] = [OBJ_ID, KIND, LOCATION, CARRIED_BY, IS_CARRYING];

pub fn is_mandatory(key: &str) -> bool {
    MANDATORY.contains(&key)
}

pub fn is_immutable(key: &str) -> bool {
    IMMUTABLE.contains(&key)
}

fn value_of<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub(crate) fn flatten(entity: &Entity) -> PropertyMap {
    let mut map = entity.properties.clone();
    let mut put = |key: &str, value: Value| {
        map.insert(key.to_string(), value);
    };
    put(OBJ_ID, value_of(&entity.id()));
    put(NAME, value_of(&entity.name));
    put(KIND, value_of(entity.kind()));
    put(LOCATION, value_of(&entity.location()));
    put(IS_TRAVERSABLE, value_of(&entity.traversable));
    put(IS_MOVABLE, value_of(&entity.movable));
    put(CARRIED_BY, value_of(entity.carried_by()));
    if let Some(avatar) = entity.avatar() {
        put(TEAM, value_of(&avatar.team));
        put(SPEED_IN_TICKS, value_of(&avatar.speed_in_ticks));
        put(IS_HUMAN_CONTROLLED, value_of(&avatar.human_controlled));
        put(IS_CARRYING, value_of(&avatar.carrying()));
        put(ACTION_SET, value_of(&avatar.actions));
        put(SENSE_CAPABILITY, value_of(&avatar.senses));
    }
    map
}

/// One validated edit to an avatar.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Change {
    Name(String),
    Traversable(bool),
    Movable(bool),
    Team(String),
    Speed(u64),
    HumanControlled(bool),
    Actions(ActionSet),
    Senses(SenseCapability),
    SetCustom(String, Value),
    RemoveCustom(String),
}

impl Change {
    pub(crate) fn apply(self, entity: &mut Entity) {
        match self {
            Change::Name(name) => entity.name = name,
            Change::Traversable(t) => entity.traversable = t,
            Change::Movable(m) => entity.movable = m,
            Change::SetCustom(key, value) => {
                entity.properties.insert(key, value);
            }
            Change::RemoveCustom(key) => {
                entity.properties.remove(&key);
            }
            other => {
                if let Some(avatar) = entity.avatar_mut() {
                    match other {
                        Change::Team(team) => avatar.team = team,
                        Change::Speed(speed) => avatar.speed_in_ticks = speed,
                        Change::HumanControlled(h) => avatar.human_controlled = h,
                        Change::Actions(actions) => avatar.actions = actions,
                        Change::Senses(senses) => avatar.senses = senses,
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Compares the map a policy returned against the avatar's current one and
/// turns every difference into a [`Change`], or fails on the first illegal one.
///
/// Nothing is applied here; a rejected map leaves the avatar untouched.
pub(crate) fn diff(agent: &Entity, updated: &PropertyMap) -> Result<Vec<Change>, WorldError> {
    let id = agent.id();
    let writable = match agent.avatar() {
        Some(avatar) => avatar.writable(),
        None => return Err(WorldError::NotAnAgent(id)),
    };
    let current = flatten(agent);
    let mut changes = Vec::new();

    for (key, old) in &current {
        let Some(new) = updated.get(key) else {
            if is_mandatory(key) {
                return Err(WorldError::PropertyRemoved {
                    agent: id,
                    property: key.clone(),
                });
            }
            if !writable.contains(key) {
                return Err(WorldError::PropertyNotWritable {
                    agent: id,
                    property: key.clone(),
                });
            }
            changes.push(Change::RemoveCustom(key.clone()));
            continue;
        };
        if new == old {
            continue;
        }
        if is_immutable(key) || !writable.contains(key) {
            return Err(WorldError::PropertyNotWritable {
                agent: id,
                property: key.clone(),
            });
        }
        changes.push(typed_change(id, key, new)?);
    }

    for (key, value) in updated {
        if current.contains_key(key) {
            continue;
        }
        if !writable.contains(key) {
            return Err(WorldError::UnknownProperty {
                agent: id,
                property: key.clone(),
            });
        }
        changes.push(Change::SetCustom(key.clone(), value.clone()));
    }

    Ok(changes)
}

fn parse<T: DeserializeOwned>(
    agent: crate::EntityId,
    key: &str,
    value: &Value,
) -> Result<T, WorldError> {
    serde_json::from_value(value.clone()).map_err(|err| WorldError::InvalidPropertyValue {
        agent,
        property: key.to_string(),
        reason: err.to_string(),
    })
}

fn typed_change(agent: crate::EntityId, key: &str, value: &Value) -> Result<Change, WorldError> {
    let change = match key {
        NAME => Change::Name(parse(agent, key, value)?),
        IS_TRAVERSABLE => Change::Traversable(parse(agent, key, value)?),
        IS_MOVABLE => Change::Movable(parse(agent, key, value)?),
        TEAM => Change::Team(parse(agent, key, value)?),
        SPEED_IN_TICKS => {
            let speed: u64 = parse(agent, key, value)?;
            if speed == 0 {
                return Err(WorldError::InvalidPropertyValue {
                    agent,
                    property: key.to_string(),
                    reason: "speed must be at least one tick".to_string(),
                });
            }
            Change::Speed(speed)
        }
        IS_HUMAN_CONTROLLED => Change::HumanControlled(parse(agent, key, value)?),
        ACTION_SET => Change::Actions(parse(agent, key, value)?),
        SENSE_CAPABILITY => Change::Senses(parse(agent, key, value)?),
        _ => Change::SetCustom(key.to_string(), value.clone()),
    };
    Ok(change)
}

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    ActionKind, ActionRequest, AgentPolicy, Decision, DecisionInput, EntityId, EntityKind,
    EntitySnapshot, ObjectKind, UserInput,
};

/// Turns key presses into actions for a human-controlled avatar.
///
/// Input is a key string or an array of them (the last one wins). Targeted
/// actions pick the nearest perceived entity that fits: a closed or open door
/// for the door actions, a movable uncarried entity for grabbing.
#[derive(Debug, Clone)]
pub struct KeymapPolicy {
    keys: BTreeMap<String, ActionKind>,
}

impl KeymapPolicy {
    pub fn new(keys: impl IntoIterator<Item = (String, ActionKind)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn bind(mut self, key: impl Into<String>, kind: ActionKind) -> Self {
        self.keys.insert(key.into(), kind);
        self
    }

    pub fn lookup(&self, key: &str) -> Option<ActionKind> {
        self.keys.get(key).copied()
    }

    fn pressed(input: &UserInput) -> Option<&str> {
        match input {
            Value::String(key) => Some(key.as_str()),
            Value::Array(keys) => keys.iter().rev().find_map(Value::as_str),
            _ => None,
        }
    }

    fn nearest(
        input: &DecisionInput,
        fits: impl Fn(&EntitySnapshot) -> bool,
    ) -> Option<EntityId> {
        input
            .observation
            .nearest_first()
            .into_iter()
            .find(|e| fits(e))
            .map(|e| e.id)
    }

    fn request(input: &DecisionInput, kind: ActionKind) -> Option<ActionRequest> {
        let door = EntityKind::Object(ObjectKind::Door);
        let is_open = |e: &EntitySnapshot| {
            e.properties
                .get(crate::properties::IS_OPEN)
                .and_then(Value::as_bool)
        };
        let target = match kind {
            ActionKind::OpenDoor => {
                Self::nearest(input, |e| e.kind == door && is_open(e) == Some(false))
            }
            ActionKind::CloseDoor => {
                Self::nearest(input, |e| e.kind == door && is_open(e) == Some(true))
            }
            ActionKind::GrabObject => {
                Self::nearest(input, |e| e.movable && e.carried_by.is_empty())
            }
            ActionKind::RemoveObject => Self::nearest(input, |_| true),
            _ => return Some(ActionRequest::new(kind)),
        };
        target.map(|id| ActionRequest::new(kind).target(id))
    }
}

impl Default for KeymapPolicy {
    fn default() -> Self {
        Self::new([])
            .bind("w", ActionKind::MoveNorth)
            .bind("d", ActionKind::MoveEast)
            .bind("s", ActionKind::MoveSouth)
            .bind("a", ActionKind::MoveWest)
            .bind("o", ActionKind::OpenDoor)
            .bind("c", ActionKind::CloseDoor)
            .bind("g", ActionKind::GrabObject)
            .bind("p", ActionKind::DropObject)
    }
}

impl AgentPolicy for KeymapPolicy {
    fn decide(&mut self, input: DecisionInput) -> Decision {
        let request = input
            .user_input
            .as_ref()
            .and_then(Self::pressed)
            .and_then(|key| self.lookup(key))
            .and_then(|kind| Self::request(&input, kind));
        match request {
            Some(request) => input.act(request),
            None => input.idle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_extend_an_empty_keymap() {
        let keymap = KeymapPolicy::default();
        assert_eq!(keymap.lookup("w"), Some(ActionKind::MoveNorth));
        assert_eq!(keymap.lookup("p"), Some(ActionKind::DropObject));
        assert_eq!(keymap.lookup("x"), None);
        assert_eq!(keymap.keys.len(), 8);

        let rebound = KeymapPolicy::new([("x".to_string(), ActionKind::RemoveObject)]);
        assert_eq!(rebound.lookup("x"), Some(ActionKind::RemoveObject));
        assert_eq!(rebound.lookup("w"), None);
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EntityId, EntityKind, EntitySnapshot, GridShape};

/// What one avatar perceives at one tick: its own snapshot plus every other
/// entity matched by its sense capability, keyed (and thus ordered) by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub tick: u64,
    pub grid: GridShape,
    pub agent: EntityId,
    pub own: EntitySnapshot,
    pub perceived: BTreeMap<EntityId, EntitySnapshot>,
}

impl Observation {
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        if id == self.agent {
            return Some(&self.own);
        }
        self.perceived.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.perceived.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.perceived.values()
    }

    pub fn of_kind<'a>(&'a self, kind: &'a EntityKind) -> impl Iterator<Item = &'a EntitySnapshot> {
        self.perceived.values().filter(move |e| &e.kind == kind)
    }

    /// Drops perceived entities the predicate rejects. Policies use this to
    /// filter what they pass on.
    pub fn retain(&mut self, mut keep: impl FnMut(&EntitySnapshot) -> bool) {
        self.perceived.retain(|_, snapshot| keep(snapshot));
    }

    /// Perceived entities sorted by distance from the observer, ties by id.
    pub fn nearest_first(&self) -> Vec<&EntitySnapshot> {
        let origin = self.own.location;
        let mut all: Vec<_> = self.perceived.values().collect();
        all.sort_by(|a, b| {
            origin
                .distance(a.location)
                .total_cmp(&origin.distance(b.location))
                .then(a.id.cmp(&b.id))
        });
        all
    }
}

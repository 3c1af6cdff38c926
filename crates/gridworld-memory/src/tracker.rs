use std::collections::BTreeMap;

use gridworld_core::{EntityId, EntitySnapshot, GridShape, Observation};
use serde::{Deserialize, Serialize};

use crate::TraversabilityMap;

/// Counters at or below this are treated as zero.
pub const FORGET_EPSILON: f64 = 1e-9;

/// Turns a `knowledge_decay` setting into a per-tick rate.
///
/// Values above 1 mean "forget after that many ticks", negative or NaN values
/// mean "never forget".
pub fn decay_rate(knowledge_decay: f64) -> f64 {
    if knowledge_decay.is_nan() || knowledge_decay <= 0.0 {
        0.0
    } else if knowledge_decay > 1.0 {
        1.0 / knowledge_decay
    } else {
        knowledge_decay
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remembered {
    pub snapshot: EntitySnapshot,
    /// 1.0 when just seen, falling towards 0.
    pub confidence: f64,
    pub last_seen: u64,
}

/// What one [`StateTracker::update`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    pub refreshed: Vec<EntityId>,
    /// Faded out.
    pub expired: Vec<EntityId>,
    /// Should have been visible but was not.
    pub confirmed_gone: Vec<EntityId>,
}

#[derive(Debug, Clone)]
pub struct StateTracker {
    agent: EntityId,
    rate: f64,
    memory: BTreeMap<EntityId, Remembered>,
    own: Option<EntitySnapshot>,
    grid: Option<GridShape>,
    last_tick: Option<u64>,
}

impl StateTracker {
    pub fn new(agent: EntityId, knowledge_decay: f64) -> Self {
        Self {
            agent,
            rate: decay_rate(knowledge_decay),
            memory: BTreeMap::new(),
            own: None,
            grid: None,
            last_tick: None,
        }
    }

    pub fn agent(&self) -> EntityId {
        self.agent
    }

    pub fn decay_rate(&self) -> f64 {
        self.rate
    }

    /// Folds in a fresh observation.
    ///
    /// In order: every counter decays by `rate` per tick elapsed since the
    /// previous update; counters that reach zero are dropped; everything
    /// perceived is stored with confidence 1.0; anything remembered but not
    /// perceived whose remembered cell lies inside the agent's current range
    /// for its kind is dropped as confirmed gone.
    pub fn update(&mut self, observation: &Observation) -> TrackerUpdate {
        let mut update = TrackerUpdate::default();
        let elapsed = match self.last_tick {
            Some(last) => observation.tick.saturating_sub(last),
            None => 0,
        };

        if elapsed > 0 && self.rate > 0.0 {
            let fade = self.rate * elapsed as f64;
            for remembered in self.memory.values_mut() {
                remembered.confidence -= fade;
            }
            self.memory.retain(|id, remembered| {
                let keep = remembered.confidence > FORGET_EPSILON;
                if !keep {
                    update.expired.push(*id);
                }
                keep
            });
        }

        for (id, snapshot) in &observation.perceived {
            self.memory.insert(
                *id,
                Remembered {
                    snapshot: snapshot.clone(),
                    confidence: 1.0,
                    last_seen: observation.tick,
                },
            );
            update.refreshed.push(*id);
        }

        if let Some(senses) = observation.own.avatar.as_ref().map(|a| &a.senses) {
            let origin = observation.own.location;
            self.memory.retain(|id, remembered| {
                if observation.perceived.contains_key(id) {
                    return true;
                }
                let visible = senses
                    .range_for(&remembered.snapshot.kind)
                    .is_some_and(|range| range.contains(origin.distance(remembered.snapshot.location)));
                if visible {
                    update.confirmed_gone.push(*id);
                }
                !visible
            });
        }

        if !update.expired.is_empty() || !update.confirmed_gone.is_empty() {
            tracing::debug!(
                agent = %self.agent,
                tick = observation.tick,
                expired = update.expired.len(),
                gone = update.confirmed_gone.len(),
                "Forgot entities"
            );
        }

        self.own = Some(observation.own.clone());
        self.grid = Some(observation.grid);
        self.last_tick = Some(observation.tick);
        update
    }

    pub fn get(&self, id: EntityId) -> Option<&Remembered> {
        self.memory.get(&id)
    }

    pub fn confidence(&self, id: EntityId) -> Option<f64> {
        self.memory.get(&id).map(|r| r.confidence)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.memory.contains_key(&id)
    }

    /// Remembered entities in id order.
    pub fn remembered(&self) -> impl Iterator<Item = &Remembered> {
        self.memory.values()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// The agent's own snapshot from the latest update.
    pub fn own(&self) -> Option<&EntitySnapshot> {
        self.own.as_ref()
    }

    pub fn grid(&self) -> Option<GridShape> {
        self.grid
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    pub fn forget(&mut self, id: EntityId) -> Option<Remembered> {
        self.memory.remove(&id)
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }

    /// Blocked cells as far as the agent knows: every remembered entity that
    /// is intraversable and not being carried. Empty before the first update.
    pub fn traversability_map(&self) -> TraversabilityMap {
        let mut map = TraversabilityMap::new(self.grid.unwrap_or(GridShape::new(0, 0)));
        for remembered in self.memory.values() {
            let snapshot = &remembered.snapshot;
            if !snapshot.traversable && snapshot.carried_by.is_empty() {
                map.set_blocked(snapshot.location, true);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_setting_conversion() {
        assert_eq!(decay_rate(0.25), 0.25);
        assert_eq!(decay_rate(1.0), 1.0);
        assert_eq!(decay_rate(4.0), 0.25);
        assert_eq!(decay_rate(-2.0), 0.0);
        assert_eq!(decay_rate(f64::NAN), 0.0);
    }
}

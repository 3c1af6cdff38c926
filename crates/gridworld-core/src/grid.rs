use std::collections::BTreeMap;

use crate::{EntityId, EntityStore, Location};

/// Sparse occupancy map. Each occupied cell lists its occupants in insertion
/// order; empty cells are absent. Carried entities never appear here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridIndex {
    cells: BTreeMap<Location, Vec<EntityId>>,
}

impl GridIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupants(&self, cell: Location) -> &[EntityId] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn place(&mut self, id: EntityId, cell: Location) {
        let occupants = self.cells.entry(cell).or_default();
        if !occupants.contains(&id) {
            occupants.push(id);
        }
    }

    pub fn remove(&mut self, id: EntityId, cell: Location) {
        if let Some(occupants) = self.cells.get_mut(&cell) {
            occupants.retain(|o| *o != id);
            if occupants.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Recomputes every cell from entity positions: objects first, then
    /// avatars in registration order.
    pub fn rebuild(&mut self, store: &EntityStore) {
        self.clear();
        for entity in store.objects().filter(|e| !e.is_carried()) {
            self.place(entity.id(), entity.location());
        }
        for id in store.agents() {
            if let Some(entity) = store.get(*id).filter(|e| !e.is_carried()) {
                self.place(entity.id(), entity.location());
            }
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (Location, &[EntityId])> {
        self.cells.iter().map(|(loc, ids)| (*loc, ids.as_slice()))
    }

    /// Occupied cells within Euclidean `radius` of `origin`, in location
    /// order. Only the column band `origin.x ± radius` is visited.
    pub fn near(
        &self,
        origin: Location,
        radius: f64,
    ) -> impl Iterator<Item = (Location, &[EntityId])> {
        let lo = (f64::from(origin.x) - radius).floor() as i32;
        let hi = ((f64::from(origin.x) + radius).ceil() as i32).max(lo);
        self.cells
            .range(Location::new(lo, i32::MIN)..=Location::new(hi, i32::MAX))
            .filter(move |(loc, _)| origin.distance(**loc) <= radius)
            .map(|(loc, ids)| (*loc, ids.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

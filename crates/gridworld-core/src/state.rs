use std::collections::{BTreeMap, BTreeSet};

use crate::properties::{self, Change, PropertyMap};
use crate::{
    AvatarSpec, Entity, EntityId, EntityStore, GridIndex, GridShape, LastAction, Location,
    ObjectSpec, Observation, SenseRange, TypeFilter, WorldError,
};

/// Everything the scheduler mutates: entities, occupancy and the tick counter.
///
/// Actions and object hooks receive `&mut WorldState`; the structural
/// operations here ([`relocate`](Self::relocate), [`attach`](Self::attach),
/// [`detach`](Self::detach), [`remove`](Self::remove)) keep grid membership and
/// carrying links consistent.
#[derive(Debug)]
pub struct WorldState {
    shape: GridShape,
    tick: u64,
    store: EntityStore,
    grid: GridIndex,
}

impl WorldState {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            tick: 0,
            store: EntityStore::new(),
            grid: GridIndex::new(),
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.store.get(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.store.contains(id)
    }

    pub fn location_of(&self, id: EntityId) -> Option<Location> {
        self.store.get(id).map(Entity::location)
    }

    /// Custom properties of an entity, for hooks that animate objects.
    pub fn properties_mut(&mut self, id: EntityId) -> Option<&mut PropertyMap> {
        self.store.get_mut(id).map(|e| &mut e.properties)
    }

    pub fn insert_object(&mut self, spec: ObjectSpec) -> Result<EntityId, WorldError> {
        let id = self.store.allocate();
        self.check_placement(id, spec.location, spec.traversable)?;
        let entity = Entity::from_object(id, spec);
        self.grid.place(id, entity.location());
        self.store.insert(entity);
        Ok(id)
    }

    pub fn insert_avatar(&mut self, spec: AvatarSpec) -> Result<EntityId, WorldError> {
        let id = self.store.allocate();
        self.check_placement(id, spec.location, spec.traversable)?;
        let entity = Entity::from_avatar(id, spec);
        self.grid.place(id, entity.location());
        self.store.insert(entity);
        Ok(id)
    }

    fn check_placement(
        &self,
        entity: EntityId,
        location: Location,
        traversable: bool,
    ) -> Result<(), WorldError> {
        if !self.shape.contains(location) {
            return Err(WorldError::OutOfGrid { entity, location });
        }
        if !traversable {
            if let Some(occupant) = self.intraversable_at(location, Some(entity)) {
                return Err(WorldError::PlacementConflict {
                    entity,
                    location,
                    occupant,
                });
            }
        }
        Ok(())
    }

    /// First intraversable grid occupant of `cell`, ignoring `except`.
    pub fn intraversable_at(&self, cell: Location, except: Option<EntityId>) -> Option<EntityId> {
        self.grid
            .occupants(cell)
            .iter()
            .copied()
            .filter(|id| Some(*id) != except)
            .find(|id| self.store.get(*id).is_some_and(|e| !e.traversable))
    }

    /// Every entity (carried ones included) whose kind matches `filter` and
    /// whose distance from `origin` is within `range`, in id order.
    pub fn objects_in_range(
        &self,
        origin: Location,
        filter: &TypeFilter,
        range: SenseRange,
    ) -> Vec<EntityId> {
        let SenseRange::Limited(radius) = range else {
            return self
                .store
                .iter()
                .filter(|e| filter.matches(e.kind()))
                .map(Entity::id)
                .collect();
        };

        // Carried entities share their holder's location but are not on the
        // grid, so they are reached through the holders found there.
        let mut found = BTreeSet::new();
        let mut pending: Vec<EntityId> = self
            .grid
            .near(origin, radius)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        while let Some(id) = pending.pop() {
            if !found.insert(id) {
                continue;
            }
            if let Some(avatar) = self.store.get(id).and_then(Entity::avatar) {
                pending.extend(avatar.carrying());
            }
        }
        found
            .into_iter()
            .filter(|id| self.store.get(*id).is_some_and(|e| filter.matches(e.kind())))
            .collect()
    }

    /// Whether `holder` carries `item`, directly or through a chain of
    /// carriers.
    pub fn holds(&self, holder: EntityId, item: EntityId) -> bool {
        let mut seen = BTreeSet::new();
        let mut pending = vec![item];
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(entity) = self.store.get(id) else {
                continue;
            };
            if entity.carried_by().contains(&holder) {
                return true;
            }
            pending.extend(entity.carried_by().iter().copied());
        }
        false
    }

    /// The bounded observation of `agent`: the union of
    /// [`objects_in_range`](Self::objects_in_range) over its capability
    /// entries, excluding itself.
    pub fn observe(&self, agent: EntityId) -> Result<Observation, WorldError> {
        let entity = self
            .store
            .get(agent)
            .ok_or(WorldError::UnknownEntity(agent))?;
        let avatar = entity.avatar().ok_or(WorldError::NotAnAgent(agent))?;

        let origin = entity.location();
        let mut perceived = BTreeMap::new();
        for (filter, range) in avatar.senses.entries() {
            for id in self.objects_in_range(origin, filter, *range) {
                if id == agent || perceived.contains_key(&id) {
                    continue;
                }
                if let Some(other) = self.store.get(id) {
                    perceived.insert(id, other.snapshot(self.tick));
                }
            }
        }

        Ok(Observation {
            tick: self.tick,
            grid: self.shape,
            agent,
            own: entity.snapshot(self.tick),
            perceived,
        })
    }

    /// Moves `id` and, transitively, everything it carries.
    ///
    /// Fails if the target is off-grid or if `id` is an intraversable grid
    /// occupant and the target already holds another one.
    pub fn relocate(&mut self, id: EntityId, to: Location) -> Result<(), WorldError> {
        let entity = self.store.get(id).ok_or(WorldError::UnknownEntity(id))?;
        if !self.shape.contains(to) {
            return Err(WorldError::OutOfGrid {
                entity: id,
                location: to,
            });
        }
        if !entity.is_carried() && !entity.traversable {
            if let Some(occupant) = self.intraversable_at(to, Some(id)) {
                return Err(WorldError::PlacementConflict {
                    entity: id,
                    location: to,
                    occupant,
                });
            }
        }
        self.move_unchecked(id, to);
        Ok(())
    }

    fn move_unchecked(&mut self, id: EntityId, to: Location) {
        let Some(entity) = self.store.get_mut(id) else {
            return;
        };
        let from = entity.location();
        entity.set_location(to);
        let on_grid = !entity.is_carried();
        let carried = entity
            .avatar()
            .map(|a| a.carrying().to_vec())
            .unwrap_or_default();

        if on_grid {
            self.grid.remove(id, from);
            self.grid.place(id, to);
        }
        for item in carried {
            self.move_unchecked(item, to);
        }
    }

    /// `holder` picks up `item`: the item leaves the grid and follows its
    /// holder from now on. Fails with [`WorldError::CarryCycle`] if `item` is
    /// `holder` or is already carrying it.
    pub fn attach(&mut self, holder: EntityId, item: EntityId) -> Result<(), WorldError> {
        let holder_entity = self
            .store
            .get(holder)
            .ok_or(WorldError::UnknownEntity(holder))?;
        if !holder_entity.is_avatar() {
            return Err(WorldError::NotAnAgent(holder));
        }
        let to = holder_entity.location();
        if item == holder || self.holds(item, holder) {
            return Err(WorldError::CarryCycle { holder, item });
        }

        let item_entity = self
            .store
            .get_mut(item)
            .ok_or(WorldError::UnknownEntity(item))?;
        let from = item_entity.location();
        let was_on_grid = !item_entity.is_carried();
        item_entity.carried_by_mut().insert(holder);
        if was_on_grid {
            self.grid.remove(item, from);
        }
        if let Some(avatar) = self.store.get_mut(holder).and_then(Entity::avatar_mut) {
            avatar.carrying.push(item);
        }
        self.move_unchecked(item, to);
        Ok(())
    }

    /// `holder` lets go of `item` and the item is set down at `at`.
    ///
    /// The caller is responsible for `at` respecting occupancy.
    pub fn detach(&mut self, holder: EntityId, item: EntityId, at: Location) -> Result<(), WorldError> {
        if !self.shape.contains(at) {
            return Err(WorldError::OutOfGrid {
                entity: item,
                location: at,
            });
        }
        let avatar = self
            .store
            .get_mut(holder)
            .and_then(Entity::avatar_mut)
            .ok_or(WorldError::NotAnAgent(holder))?;
        avatar.carrying.retain(|c| *c != item);

        let entity = self
            .store
            .get_mut(item)
            .ok_or(WorldError::UnknownEntity(item))?;
        entity.carried_by_mut().remove(&holder);
        self.move_unchecked(item, at);
        Ok(())
    }

    /// Removes `id` together with everything it carries, unlinking it from any
    /// holder. Returns the removed ids, `id` last.
    pub fn remove(&mut self, id: EntityId) -> Result<Vec<EntityId>, WorldError> {
        if !self.store.contains(id) {
            return Err(WorldError::UnknownEntity(id));
        }
        let mut removed = Vec::new();
        self.remove_recursive(id, &mut removed);
        Ok(removed)
    }

    fn remove_recursive(&mut self, id: EntityId, removed: &mut Vec<EntityId>) {
        let carried = self
            .store
            .get(id)
            .and_then(Entity::avatar)
            .map(|a| a.carrying().to_vec())
            .unwrap_or_default();
        for item in carried {
            self.remove_recursive(item, removed);
        }

        let Some(entity) = self.store.take(id) else {
            return;
        };
        for holder in entity.carried_by() {
            if let Some(avatar) = self.store.get_mut(*holder).and_then(Entity::avatar_mut) {
                avatar.carrying.retain(|c| *c != id);
            }
        }
        if !entity.is_carried() {
            self.grid.remove(id, entity.location());
        }
        removed.push(id);
    }

    pub(crate) fn set_door_open(&mut self, door: EntityId, open: bool) {
        if let Some(entity) = self.store.get_mut(door) {
            entity.set_door_open(open);
        }
    }

    /// Starts the busy window of `agent` at the current tick.
    pub(crate) fn set_busy(&mut self, agent: EntityId, duration_in_ticks: u64) {
        let started_tick = self.tick;
        if let Some(avatar) = self.store.get_mut(agent).and_then(Entity::avatar_mut) {
            avatar.last_action = Some(LastAction {
                started_tick,
                duration_in_ticks,
            });
        }
    }

    /// Validates the property map a decision policy returned and applies it
    /// as a whole, or not at all.
    pub fn apply_agent_properties(
        &mut self,
        agent: EntityId,
        updated: &PropertyMap,
    ) -> Result<(), WorldError> {
        let entity = self
            .store
            .get(agent)
            .ok_or(WorldError::UnknownEntity(agent))?;
        let changes = properties::diff(entity, updated)?;
        if changes.is_empty() {
            return Ok(());
        }

        let becomes_solid = changes.contains(&Change::Traversable(false));
        if becomes_solid && entity.traversable && !entity.is_carried() {
            let location = entity.location();
            if let Some(occupant) = self.intraversable_at(location, Some(agent)) {
                return Err(WorldError::PlacementConflict {
                    entity: agent,
                    location,
                    occupant,
                });
            }
        }

        if let Some(entity) = self.store.get_mut(agent) {
            for change in changes {
                change.apply(entity);
            }
        }
        Ok(())
    }

    /// Recomputes grid membership from entity positions.
    pub fn rebuild_grid(&mut self) {
        self.grid.rebuild(&self.store);
    }

    /// Cells holding more than one intraversable occupant. Empty whenever the
    /// world is consistent.
    pub fn occupancy_violations(&self) -> Vec<(Location, Vec<EntityId>)> {
        self.grid
            .cells()
            .filter_map(|(cell, ids)| {
                let solid: Vec<_> = ids
                    .iter()
                    .copied()
                    .filter(|id| self.store.get(*id).is_some_and(|e| !e.traversable))
                    .collect();
                (solid.len() > 1).then_some((cell, solid))
            })
            .collect()
    }
}

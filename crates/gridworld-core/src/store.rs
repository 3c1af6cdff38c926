use std::collections::BTreeMap;

use crate::{Entity, EntityId, IdGenerator};

/// Owns every entity of one run and the id generator that names them.
///
/// Iteration is by id, which is creation order. Avatars additionally keep their
/// registration order, which is the order the scheduler serves them in.
#[derive(Debug, Default)]
pub struct EntityStore {
    ids: IdGenerator,
    entities: BTreeMap<EntityId, Entity>,
    agents: Vec<EntityId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws an id. A rejected placement still consumes it.
    pub(crate) fn allocate(&mut self) -> EntityId {
        self.ids.next_id()
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        if entity.is_avatar() {
            self.agents.push(entity.id());
        }
        self.entities.insert(entity.id(), entity);
    }

    pub(crate) fn take(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if entity.is_avatar() {
            self.agents.retain(|agent| *agent != id);
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Avatars in registration order.
    pub fn agents(&self) -> &[EntityId] {
        &self.agents
    }

    pub fn objects(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| !e.is_avatar())
    }
}

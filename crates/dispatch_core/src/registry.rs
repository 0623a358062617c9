//! Id -> entity lookup for the fleet and the live requesters.
//!
//! Both registries live as resources inside the dispatcher's world; nothing else
//! hands out ids or entity handles.

use std::collections::{BTreeMap, HashMap};

use bevy_ecs::prelude::{Entity, Resource};

pub fn vehicle_id(index: usize) -> String {
    format!("vehicle-{index:03}")
}

pub fn requester_id(serial: u64) -> String {
    format!("req-{serial:05}")
}

/// The fleet, fixed at startup. Iteration is in vehicle id order.
#[derive(Debug, Default, Resource)]
pub struct FleetRoster {
    by_id: BTreeMap<String, Entity>,
    ids: Vec<String>,
    max_capacity: u32,
}

impl FleetRoster {
    pub fn insert(&mut self, id: String, entity: Entity, capacity: u32) {
        self.max_capacity = self.max_capacity.max(capacity);
        self.by_id.insert(id, entity);
        self.ids = self.by_id.keys().cloned().collect();
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Entity)> {
        self.by_id.iter().map(|(id, e)| (id.as_str(), *e))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }
}

/// Live requesters. Delivered and cancelled ones are removed.
#[derive(Debug, Default, Resource)]
pub struct RequesterIndex {
    by_id: HashMap<String, Entity>,
    next_serial: u64,
}

impl RequesterIndex {
    /// Reserve the next requester id.
    pub fn next_id(&mut self) -> String {
        let id = requester_id(self.next_serial);
        self.next_serial += 1;
        id
    }

    pub fn insert(&mut self, id: String, entity: Entity) {
        self.by_id.insert(id, entity);
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Entities in requester id order.
    pub fn sorted_entities(&self) -> Vec<Entity> {
        let mut entries: Vec<_> = self.by_id.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, e)| *e).collect()
    }
}

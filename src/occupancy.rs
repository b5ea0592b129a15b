//! Hands out stable occupancy identities.
use std::hash::Hash;

use bevy::prelude::Entity;

use crate::{cell::OccupantId, FxIndexSet};

/// Assigns every tracked entity a dense, sequential [`OccupantId`] the first time it is seen.
///
/// Ids are never reassigned or freed for the lifetime of the registry, so an id
/// stamped on a cell always refers to the same entity.
#[derive(Debug, Clone)]
pub struct OccupancyRegistry<K: Hash + Eq = Entity> {
    keys: FxIndexSet<K>,
}

impl<K: Hash + Eq> Default for OccupancyRegistry<K> {
    fn default() -> Self {
        OccupancyRegistry {
            keys: FxIndexSet::default(),
        }
    }
}

impl<K: Hash + Eq> OccupancyRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id previously assigned to `key`, or the next free one.
    pub fn get_or_create_index(&mut self, key: K) -> OccupantId {
        let (index, _) = self.keys.insert_full(key);
        OccupantId(index as u32)
    }

    /// The id assigned to `key`, without assigning one.
    pub fn get(&self, key: &K) -> Option<OccupantId> {
        self.keys.get_index_of(key).map(|index| OccupantId(index as u32))
    }

    /// The key an id was assigned to.
    pub fn key_of(&self, id: OccupantId) -> Option<&K> {
        self.keys.get_index(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

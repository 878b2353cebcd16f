//! Insertion-ordered entity collections with O(1) lookup by id.
//!
//! Entities never hold references to each other. Relations such as
//! task → citizen or hotspot → zone are stored as ids and resolved
//! against the owning arena.

use crate::{
    error::{SimError, SimResult},
    types::EntityId,
};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Anything stored in an [`Arena`] exposes a stable key.
/// The key must not change while the value is inside an arena.
pub trait Keyed {
    fn key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arena<T> {
    items: Vec<T>,
    index: HashMap<EntityId, usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new(), index: HashMap::new() }
    }
}

impl<T: Keyed> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    /// Append a value. A key already present is rejected and the arena
    /// is left as it was.
    pub fn insert(&mut self, item: T) -> SimResult<()> {
        if self.index.contains_key(item.key()) {
            return Err(SimError::rejected(format!("Duplicate id: {}", item.key())));
        }
        self.index.insert(item.key().to_string(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Remove by key, preserving the order of the remaining values.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let i = self.index.remove(key)?;
        let removed = self.items.remove(i);
        for item in &self.items[i..] {
            if let Some(slot) = self.index.get_mut(item.key()) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Keyed> TryFrom<Vec<T>> for Arena<T> {
    type Error = SimError;

    /// Fails on the first repeated key.
    fn try_from(items: Vec<T>) -> SimResult<Self> {
        let mut arena = Self::default();
        for item in items {
            arena.insert(item)?;
        }
        Ok(arena)
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// Serialized as a plain sequence; the index is rebuilt on load.
impl<T: Serialize> Serialize for Arena<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Keyed> Deserialize<'de> for Arena<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Arena::try_from(items).map_err(D::Error::custom)
    }
}

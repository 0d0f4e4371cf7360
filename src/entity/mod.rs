//! Normalized collections for list-shaped slices.
//!
//! An [`EntityCollection`] keeps an ordered key index alongside a key-to-value
//! map, so lookups stay O(1) while iteration order stays deterministic. Every
//! operation is pure: it takes `&self` and returns a fresh collection, leaving
//! the argument untouched, which is what lets reducers replace slices
//! wholesale.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// A record with a stable identity, usable inside an [`EntityCollection`].
pub trait Entity: Clone + Send + Sync + 'static {
    /// Key type identifying a record. Typically a `String` or integer id.
    type Key: Clone + Eq + Hash + Send + Sync + 'static;

    /// The record's key. Must be stable for the record's lifetime.
    fn key(&self) -> Self::Key;
}

/// Ordering rule for a collection's key index.
pub enum Order<T> {
    /// Keys keep the position they were first inserted at.
    Insertion,
    /// Keys are kept sorted by comparing their entity values.
    By(fn(&T, &T) -> CmpOrdering),
}

impl<T> Clone for Order<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Order<T> {}

impl<T> Default for Order<T> {
    fn default() -> Self {
        Order::Insertion
    }
}

impl<T> PartialEq for Order<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Order::Insertion, Order::Insertion) => true,
            (Order::By(a), Order::By(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for Order<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Insertion => f.write_str("Insertion"),
            Order::By(_) => f.write_str("By(..)"),
        }
    }
}

/// Ordered unique-key index plus value map.
///
/// Invariants, preserved by every operation: `ids` holds each key exactly
/// once, and `ids` and `entities` always cover the same key set.
///
/// Serialization covers `ids` and `entities` only; the ordering rule is a
/// function pointer and deserializes to insertion order. Deserialized
/// payloads are trusted to satisfy the invariants.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, T::Key: Serialize",
    deserialize = "T: Deserialize<'de>, T::Key: Deserialize<'de>"
))]
pub struct EntityCollection<T: Entity> {
    ids: Vec<T::Key>,
    entities: HashMap<T::Key, T>,
    #[serde(skip)]
    order: Order<T>,
}

impl<T: Entity> EntityCollection<T> {
    /// Empty collection in insertion order.
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            order: Order::Insertion,
        }
    }

    /// Empty collection kept sorted by `compare`.
    pub fn with_order(compare: fn(&T, &T) -> CmpOrdering) -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            order: Order::By(compare),
        }
    }

    /// Keys in collection order.
    pub fn ids(&self) -> &[T::Key] {
        &self.ids
    }

    /// Look up one entity.
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.entities.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entities in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.ids.iter().map(move |id| &self.entities[id])
    }

    /// Replace the whole collection from `items`.
    ///
    /// Duplicated keys keep the last occurrence's value; under insertion
    /// order a duplicated key keeps its first occurrence's position.
    pub fn set_all<I>(&self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut next = Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            order: self.order,
        };
        for item in items {
            let key = item.key();
            if next.entities.insert(key.clone(), item).is_none() {
                next.ids.push(key);
            }
        }
        next.resort();
        next
    }

    /// Insert one entity; no-op when its key is already present.
    ///
    /// Use [`upsert_one`](Self::upsert_one) for overwrite semantics.
    pub fn add_one(&self, item: T) -> Self {
        if self.entities.contains_key(&item.key()) {
            return self.clone();
        }
        let mut next = self.clone();
        next.insert_new(item);
        next
    }

    /// Insert several entities; keys already present are skipped.
    pub fn add_many<I>(&self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut next = self.clone();
        for item in items {
            if !next.entities.contains_key(&item.key()) {
                next.insert_new(item);
            }
        }
        next
    }

    /// Insert or overwrite one entity.
    pub fn upsert_one(&self, item: T) -> Self {
        let key = item.key();
        let mut next = self.clone();
        if next.entities.insert(key.clone(), item).is_none() {
            next.position_new(key);
        } else {
            next.resort();
        }
        next
    }

    /// Apply `change` to a copy of the entity under `key`; no-op when
    /// absent. The change must not alter the entity's key.
    pub fn update_one<F>(&self, key: &T::Key, change: F) -> Self
    where
        F: FnOnce(&mut T),
    {
        let Some(existing) = self.entities.get(key) else {
            return self.clone();
        };
        let mut updated = existing.clone();
        change(&mut updated);
        debug_assert!(updated.key() == *key, "update_one must not change the key");
        let mut next = self.clone();
        next.entities.insert(key.clone(), updated);
        next.resort();
        next
    }

    /// Apply `change` to every entity whose key is listed; absent keys
    /// are skipped.
    pub fn update_many<'k, I, F>(&self, keys: I, change: F) -> Self
    where
        I: IntoIterator<Item = &'k T::Key>,
        T::Key: 'k,
        F: Fn(&mut T),
    {
        let mut next = self.clone();
        for key in keys {
            if let Some(existing) = next.entities.get(key) {
                let mut updated = existing.clone();
                change(&mut updated);
                debug_assert!(updated.key() == *key, "update_many must not change keys");
                next.entities.insert(key.clone(), updated);
            }
        }
        next.resort();
        next
    }

    /// Remove one entity; idempotent.
    pub fn remove_one(&self, key: &T::Key) -> Self {
        if !self.entities.contains_key(key) {
            return self.clone();
        }
        let mut next = self.clone();
        next.entities.remove(key);
        next.ids.retain(|k| k != key);
        next
    }

    /// Remove several entities; absent keys are skipped.
    pub fn remove_many<'k, I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'k T::Key>,
        T::Key: 'k,
    {
        let mut next = self.clone();
        for key in keys {
            if next.entities.remove(key).is_some() {
                next.ids.retain(|k| k != key);
            }
        }
        next
    }

    /// Drop every entity, keeping the ordering rule.
    pub fn remove_all(&self) -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            order: self.order,
        }
    }

    /// Insert an entity whose key is known to be absent.
    fn insert_new(&mut self, item: T) {
        let key = item.key();
        self.entities.insert(key.clone(), item);
        self.position_new(key);
    }

    /// Place a key that is in `entities` but not yet in `ids`.
    fn position_new(&mut self, key: T::Key) {
        match self.order {
            Order::Insertion => self.ids.push(key),
            Order::By(compare) => {
                let position = {
                    let target = &self.entities[&key];
                    self.ids.partition_point(|k| {
                        compare(&self.entities[k], target) != CmpOrdering::Greater
                    })
                };
                self.ids.insert(position, key);
            }
        }
    }

    /// Restore sorted order after values changed. Stable, so equal
    /// elements keep their relative position. No-op under insertion
    /// order.
    fn resort(&mut self) {
        if let Order::By(compare) = self.order {
            let entities = &self.entities;
            self.ids
                .sort_by(|a, b| compare(&entities[a], &entities[b]));
        }
    }
}

impl<T: Entity> Default for EntityCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity + PartialEq> PartialEq for EntityCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids && self.entities == other.entities && self.order == other.order
    }
}

impl<T: Entity> FromIterator<T> for EntityCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(items: I) -> Self {
        Self::new().set_all(items)
    }
}

impl<T> fmt::Debug for EntityCollection<T>
where
    T: Entity + fmt::Debug,
    T::Key: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCollection")
            .field("ids", &self.ids)
            .field("entities", &self.entities)
            .field("order", &self.order)
            .finish()
    }
}

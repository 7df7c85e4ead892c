//! Per-entity memoization of derived values.
//!
//! Values are computed on first read and kept until explicitly invalidated.
//! There is no expiry: staleness is impossible as long as every input change
//! invalidates the affected keys.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;

/// Memo table keyed by `K`.
#[derive(Debug)]
pub struct DerivedCache<K, V = i32> {
    slots: RefCell<HashMap<K, V>>,
}

impl<K, V> DerivedCache<K, V>
where
    K: Copy + Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, computing and storing it first if
    /// the slot is empty.
    ///
    /// `compute` runs without the cache borrowed, so it may read other keys.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.slots.borrow().get(&key) {
            return value.clone();
        }
        let value = compute();
        self.slots.borrow_mut().insert(key, value.clone());
        value
    }

    pub fn get(&self, key: K) -> Option<V> {
        self.slots.borrow().get(&key).cloned()
    }

    /// Empties `key`. Returns whether a value was cached.
    pub fn invalidate(&self, key: K) -> bool {
        self.slots.borrow_mut().remove(&key).is_some()
    }

    pub fn invalidate_all(&self) {
        self.slots.borrow_mut().clear();
    }

    pub fn is_cached(&self, key: K) -> bool {
        self.slots.borrow().contains_key(&key)
    }
}

impl<K, V> Default for DerivedCache<K, V>
where
    K: Copy + Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

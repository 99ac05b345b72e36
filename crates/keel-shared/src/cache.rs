//! Memoization tables
//!
//! [`CacheTable`] is keyed by hashable values. [`IdentityCache`] is keyed by
//! object identity and keeps only a weak handle to the key object, so
//! entries for objects that are no longer reachable get dropped the next
//! time something is inserted.

use std::cell::RefCell;
use std::hash::Hash;

use keel_value::{Object, WeakObject};
use rustc_hash::FxHashMap;

/// Value-keyed memo table
#[derive(Debug)]
pub struct CacheTable<K, V> {
    entries: RefCell<FxHashMap<K, V>>,
}

impl<K, V> Default for CacheTable<K, V> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(FxHashMap::default()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> CacheTable<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.borrow_mut().insert(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Cached value for `key`, computing and storing it on a miss
    ///
    /// `compute` runs without the table borrowed, so it may consult the
    /// table itself.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity-keyed memo table holding weak key references
pub struct IdentityCache<V> {
    entries: RefCell<FxHashMap<usize, (WeakObject, V)>>,
}

impl<V> Default for IdentityCache<V> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(FxHashMap::default()),
        }
    }
}

impl<V: Clone> IdentityCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: &Object) -> Option<V> {
        let entries = self.entries.borrow();
        let (weak, value) = entries.get(&object.addr())?;
        weak.refers_to(object).then(|| value.clone())
    }

    pub fn contains(&self, object: &Object) -> bool {
        self.get(object).is_some()
    }

    pub fn insert(&self, object: &Object, value: V) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, (weak, _)| weak.is_alive());
        entries.insert(object.addr(), (object.downgrade(), value));
    }

    pub fn get_or_insert_with(&self, object: &Object, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(object) {
            return value;
        }
        let value = compute();
        self.insert(object, value.clone());
        value
    }

    /// Number of entries, including ones not yet pruned
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_table_computes_once() {
        let table: CacheTable<String, usize> = CacheTable::new();
        let mut calls = 0;
        for _ in 0..3 {
            let v = table.get_or_insert_with("k".to_string(), || {
                calls += 1;
                42
            });
            assert_eq!(v, 42);
        }
        assert_eq!(calls, 1);
        assert!(table.contains(&"k".to_string()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_identity_cache_distinguishes_objects() {
        let cache = IdentityCache::new();
        let a = Object::plain();
        let b = Object::plain();
        cache.insert(&a, "a");
        assert_eq!(cache.get(&a), Some("a"));
        assert_eq!(cache.get(&b), None);
    }

    #[test]
    fn test_identity_cache_prunes_dead_entries() {
        let cache = IdentityCache::new();
        let dead = Object::plain();
        cache.insert(&dead, 1);
        drop(dead);
        let live = Object::plain();
        cache.insert(&live, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&live), Some(2));
    }
}

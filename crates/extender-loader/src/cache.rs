// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bounded least-recently-used caches for the interception hot path

use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Capacity used when a configuration asks for a zero-sized cache
const FALLBACK_CAPACITY: NonZeroUsize = NonZeroUsize::MIN;

/// LRU cache with a fixed capacity
///
/// `get` refreshes recency; `insert` at capacity evicts the least recently
/// touched entry.
#[derive(Debug)]
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Get a cached value, marking it as recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key).cloned()
    }

    /// Check membership without touching recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains(key)
    }

    /// Store a value, evicting the least recently used entry when full
    ///
    /// Returns the evicted key, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        match self.inner.push(key, value) {
            // `push` also returns the old pair when the key was already present
            Some((evicted, _)) if !self.inner.contains(&evicted) => Some(evicted),
            _ => None,
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_inserted() {
        let mut cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.insert("c", 3), Some("a"));

        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"b"));
        assert!(cache.contains(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = BoundedCache::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.insert("d", 4), Some("b"));

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
    }

    #[test]
    fn test_reinsert_updates_value_without_eviction() {
        let mut cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.insert("a", 10), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.insert("c", 3), Some("b"));
    }

    #[test]
    fn test_zero_capacity_falls_back_to_one() {
        let mut cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a", 1);
        assert_eq!(cache.insert("b", 2), Some("a"));
    }

    #[test]
    fn test_caches_absent_values() {
        let mut cache: BoundedCache<String, Option<String>> = BoundedCache::new(4);
        cache.insert("trail".to_string(), None);
        assert_eq!(cache.get(&"trail".to_string()), Some(None));
        assert_eq!(cache.get(&"other".to_string()), None);
    }
}

//! Cache Store Module
//!
//! Fixed-capacity cache engine combining HashMap storage with LRU tracking.
//!
//! Also tracks in-flight load-throughs. A value loaded from the durable
//! store after a miss is only installed if nothing wrote or removed the key
//! while the load was running.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Fixed-capacity key-value cache with LRU eviction.
///
/// Not thread-safe on its own; see [`SharedCache`](super::SharedCache).
///
/// Every key in `entries` is tracked exactly once in `lru`, and
/// `entries.len() <= capacity` holds after every operation.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<i64, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    stats: CacheStats,
    capacity: usize,
    /// Keys with at least one load-through in flight
    fills: HashMap<i64, Fill>,
}

/// Book-keeping for the load-throughs of one key.
#[derive(Debug, Default)]
struct Fill {
    readers: usize,
    /// Bumped by every put, delete and refresh of the key
    generation: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `capacity` entries.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be at least 1");
        Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruTracker::with_capacity(capacity),
            stats: CacheStats::new(capacity),
            capacity,
            fills: HashMap::new(),
        }
    }

    // == Put ==
    /// Stores a key-value pair as the most recently used entry.
    ///
    /// Overwriting an existing key promotes it without evicting anything.
    /// Inserting a new key into a full cache first evicts the least recently
    /// used entry, whose key is returned.
    pub fn put(&mut self, key: i64, value: String) -> Option<i64> {
        self.invalidate_fills(key);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.replace(value);
            self.lru.promote(entry.slot);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        let slot = self.lru.push_front(key);
        self.entries.insert(key, CacheEntry::new(value, slot));

        evicted
    }

    // == Get ==
    /// Retrieves a value by key, promoting it on a hit.
    ///
    /// A miss leaves the cache untouched apart from the miss counter.
    pub fn get(&mut self, key: i64) -> Option<String> {
        match self.entries.get(&key) {
            Some(entry) => {
                self.lru.promote(entry.slot);
                self.stats.record_lookup(true);
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_lookup(false);
                None
            }
        }
    }

    /// Retrieves a value without changing recency or statistics.
    pub fn peek(&self, key: i64) -> Option<&str> {
        self.entries.get(&key).map(|entry| entry.value.as_str())
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether the key was resident.
    pub fn delete(&mut self, key: i64) -> bool {
        self.invalidate_fills(key);
        match self.entries.remove(&key) {
            Some(entry) => {
                self.lru.remove(entry.slot);
                true
            }
            None => false,
        }
    }

    /// Whether `key` is resident. Does not count as a lookup.
    pub fn contains(&self, key: i64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Resident keys from most to least recently used.
    pub fn keys(&self) -> Vec<i64> {
        self.lru.keys()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    /// Maximum number of resident entries, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Load-Through ==
    /// Registers a load-through of `key` after a miss.
    ///
    /// Returns the generation to hand back to [`finish_fill`](Self::finish_fill).
    pub fn begin_fill(&mut self, key: i64) -> u64 {
        let fill = self.fills.entry(key).or_default();
        fill.readers += 1;
        fill.generation
    }

    /// Ends a load-through registered by [`begin_fill`](Self::begin_fill).
    ///
    /// `value` becomes resident only when no put, delete or refresh touched
    /// `key` since registration. Passing `None` just ends the registration.
    pub fn finish_fill(&mut self, key: i64, generation: u64, value: Option<String>) -> FillOutcome {
        let Some(fill) = self.fills.get_mut(&key) else {
            return FillOutcome::default();
        };
        fill.readers -= 1;
        let unchanged = fill.generation == generation;
        if fill.readers == 0 {
            self.fills.remove(&key);
        }

        match value {
            Some(value) if unchanged => FillOutcome {
                installed: true,
                evicted: self.put(key, value),
            },
            Some(_) => {
                self.stats.record_stale_fill();
                FillOutcome::default()
            }
            None => FillOutcome::default(),
        }
    }

    /// Records that `key` now holds `value` durably.
    ///
    /// Updates a resident entry in place without promoting it, and
    /// invalidates any load-through of `key` still in flight. A key that is
    /// not resident stays absent. Returns whether an entry was updated.
    pub fn refresh(&mut self, key: i64, value: &str) -> bool {
        self.invalidate_fills(key);
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.replace(value.to_string());
                true
            }
            None => false,
        }
    }

    /// Number of keys with a load-through in flight.
    pub fn pending_fills(&self) -> usize {
        self.fills.len()
    }

    fn invalidate_fills(&mut self, key: i64) {
        if let Some(fill) = self.fills.get_mut(&key) {
            fill.generation += 1;
        }
    }

    fn evict_oldest(&mut self) -> Option<i64> {
        let key = self.lru.evict_oldest()?;
        self.entries.remove(&key);
        self.invalidate_fills(key);
        self.stats.record_eviction();
        Some(key)
    }
}

/// Result of [`CacheStore::finish_fill`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// The loaded value became resident
    pub installed: bool,
    /// Key evicted to make room for it
    pub evicted: Option<i64>,
}

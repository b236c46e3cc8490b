//! Thread-safe cache handle.
//!
//! Wraps a [`CacheStore`] in a single cache-wide lock and fans eviction
//! events out to registered listeners.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::cache::{CacheStats, CacheStore};

/// Callback invoked with the key of every entry evicted by capacity pressure.
pub type EvictionListener = Arc<dyn Fn(i64) + Send + Sync>;

/// A [`CacheStore`] shared between worker threads.
///
/// `put`, `get` and `delete` each run inside one exclusive critical section,
/// so cache operations are totally ordered among themselves. Listeners run
/// after the lock is released and may call back into the cache.
pub struct SharedCache {
    store: Mutex<CacheStore>,
    listeners: RwLock<Vec<EvictionListener>>,
    capacity: usize,
}

/// Outcome of [`SharedCache::lookup`].
#[derive(Debug)]
pub enum Lookup<'a> {
    Hit(String),
    /// The key was not resident. The ticket installs a value loaded from
    /// the durable store, unless the key changed in the meantime.
    Miss(FillTicket<'a>),
}

/// A registered load-through of one key.
///
/// Dropping the ticket without calling [`fill`](Self::fill) abandons the
/// load and installs nothing.
#[derive(Debug)]
#[must_use = "dropping a ticket abandons the load-through"]
pub struct FillTicket<'a> {
    cache: &'a SharedCache,
    key: i64,
    generation: u64,
    pending: bool,
}

impl FillTicket<'_> {
    pub fn key(&self) -> i64 {
        self.key
    }

    /// Installs `value` if no put, delete or refresh of the key happened
    /// since the miss. Returns whether it was installed.
    pub fn fill(mut self, value: String) -> bool {
        self.pending = false;
        self.cache.finish_fill(self.key, self.generation, Some(value))
    }
}

impl Drop for FillTicket<'_> {
    fn drop(&mut self) {
        if self.pending {
            self.cache.finish_fill(self.key, self.generation, None);
        }
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("store", &*self.store.lock())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl SharedCache {
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        Self {
            store: Mutex::new(CacheStore::new(capacity)),
            listeners: RwLock::new(Vec::new()),
            capacity,
        }
    }

    /// Registers a listener for eviction events.
    ///
    /// Listeners run on the evicting thread after the cache lock is
    /// released. Each eviction is reported exactly once, but two threads
    /// evicting at the same time may deliver their keys in either order.
    pub fn on_evict<F>(&self, listener: F)
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Inserts or updates `key` as most recently used.
    ///
    /// Returns the key evicted to make room, if any.
    pub fn put(&self, key: i64, value: String) -> Option<i64> {
        let evicted = self.store.lock().put(key, value);
        self.after_evict(evicted);
        evicted
    }

    /// Returns the value for `key`, promoting it on a hit.
    pub fn get(&self, key: i64) -> Option<String> {
        self.store.lock().get(key)
    }

    /// Like [`get`](Self::get), but a miss registers a load-through under
    /// the same lock acquisition.
    pub fn lookup(&self, key: i64) -> Lookup<'_> {
        let mut store = self.store.lock();
        match store.get(key) {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss(FillTicket {
                cache: self,
                key,
                generation: store.begin_fill(key),
                pending: true,
            }),
        }
    }

    /// Updates a resident `key` in place after a durable write and voids
    /// in-flight load-throughs of it. See [`CacheStore::refresh`].
    pub fn refresh(&self, key: i64, value: &str) -> bool {
        self.store.lock().refresh(key, value)
    }

    /// Removes `key`. Returns whether it was resident.
    pub fn delete(&self, key: i64) -> bool {
        self.store.lock().delete(key)
    }

    /// Whether `key` is resident, without touching recency or counters.
    pub fn contains(&self, key: i64) -> bool {
        self.store.lock().contains(key)
    }

    /// Resident keys from most to least recently used.
    pub fn keys(&self) -> Vec<i64> {
        self.store.lock().keys()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    /// Fixed at construction; does not take the lock.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    fn finish_fill(&self, key: i64, generation: u64, value: Option<String>) -> bool {
        let offered = value.is_some();
        let outcome = self.store.lock().finish_fill(key, generation, value);
        if offered && !outcome.installed {
            debug!(key, "discarded stale cache fill");
        }
        self.after_evict(outcome.evicted);
        outcome.installed
    }

    fn after_evict(&self, evicted: Option<i64>) {
        if let Some(evicted) = evicted {
            debug!(key = evicted, "evicted from cache");
            self.notify_evicted(evicted);
        }
    }

    fn notify_evicted(&self, key: i64) {
        // Clone out so listeners never run under the registry lock.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(key);
        }
    }
}

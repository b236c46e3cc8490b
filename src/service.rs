//! Key-Value Service
//!
//! Orchestrates the read cache, the connection pool and the durable store:
//! writes go through the cache to the store, reads load through the cache
//! on a miss.
//!
//! Consistency is deliberately weak. `set` updates the cache before the
//! store and does not roll back if the durable write fails, and concurrent
//! writers to one key may leave cache and store disagreeing until the next
//! successful write to that key.
//!
//! Load-through never widens that window. A value read from the store is
//! only cached if no `set` or `delete` of the key touched the cache while
//! the read was in flight, so a completed delete is never undone by a slow
//! reader.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, Lookup, SharedCache};
use crate::error::{KvError, PoolError, Result};
use crate::pool::{ConnectionPool, PoolStats, PooledConnection};
use crate::storage::{Connection, Connector};

/// Combined cache and pool counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStats,
    pub pool: PoolStats,
}

// == KV Service ==
/// The cache-fronted key-value store.
///
/// All methods are synchronous and may block while waiting for a pooled
/// connection; call them from worker threads.
pub struct KvService<K: Connector> {
    cache: SharedCache,
    pool: ConnectionPool<K::Connection>,
    /// `None` blocks until a connection frees up.
    acquire_timeout: Option<Duration>,
}

impl<K: Connector> std::fmt::Debug for KvService<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvService")
            .field("cache", &self.cache)
            .field("pool", &self.pool)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl<K: Connector> KvService<K> {
    pub fn new(cache: SharedCache, pool: ConnectionPool<K::Connection>) -> Self {
        Self {
            cache,
            pool,
            acquire_timeout: None,
        }
    }

    /// Bounds how long a request waits for a pooled connection.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Builds the cache and pool from a connector.
    pub fn connect(connector: &K, cache_capacity: usize, pool_size: usize) -> Result<Self> {
        let pool = ConnectionPool::new(connector, pool_size)?;
        Ok(Self::new(SharedCache::new(cache_capacity), pool))
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn pool(&self) -> &ConnectionPool<K::Connection> {
        &self.pool
    }

    // == Set ==
    /// Writes `value` under `key` to the cache, then to the durable store.
    ///
    /// A durable failure is reported even though the cache already holds
    /// the new value.
    pub fn set(&self, key: i64, value: String) -> Result<()> {
        self.cache.put(key, value.clone());

        let mut conn = self.checkout()?;
        if let Err(err) = conn.upsert(key, &value) {
            warn!(key, error = %err, "durable write failed; cache holds unpersisted value");
            return Err(err.into());
        }
        drop(conn);

        // A load-through that read the old row may have filled the cache
        // after it was evicted.
        self.cache.refresh(key, &value);

        debug!(key, "set");
        Ok(())
    }

    // == Get ==
    /// Reads `key` from the cache, loading it from the durable store on a
    /// miss.
    ///
    /// The loaded value is returned even when a concurrent write or delete
    /// stops it from being cached.
    pub fn get(&self, key: i64) -> Result<String> {
        let ticket = match self.cache.lookup(key) {
            Lookup::Hit(value) => {
                debug!(key, "cache hit");
                return Ok(value);
            }
            Lookup::Miss(ticket) => ticket,
        };

        let found = {
            let mut conn = self.checkout()?;
            conn.lookup(key).map_err(|err| {
                warn!(key, error = %err, "durable lookup failed");
                KvError::from(err)
            })?
        };

        match found {
            Some(value) => {
                if ticket.fill(value.clone()) {
                    debug!(key, "loaded from store");
                }
                Ok(value)
            }
            None => Err(KvError::NotFound(key)),
        }
    }

    // == Delete ==
    /// Deletes `key` from the durable store, then from the cache.
    ///
    /// The cache entry is dropped whatever the durable outcome, so a value
    /// deleted durably is never served afterwards. Returns `NotFound` when
    /// no durable record matched.
    pub fn delete(&self, key: i64) -> Result<()> {
        let outcome = self
            .checkout()
            .map_err(KvError::from)
            .and_then(|mut conn| conn.delete(key).map_err(KvError::from));

        self.cache.delete(key);

        match outcome {
            Ok(true) => {
                debug!(key, "deleted");
                Ok(())
            }
            Ok(false) => Err(KvError::NotFound(key)),
            Err(err) => {
                warn!(key, error = %err, "durable delete failed");
                Err(err)
            }
        }
    }

    // == Warm Load ==
    /// Fills the cache with up to `limit` durable records, capped at the
    /// cache capacity. Returns how many were loaded.
    ///
    /// Meant for startup, before requests are served.
    pub fn warm_load(&self, limit: usize) -> Result<usize> {
        let limit = limit.min(self.cache.capacity());
        let records = self.checkout()?.scan(limit)?;

        let loaded = records.len();
        for record in records {
            self.cache.put(record.key, record.value);
        }

        info!(loaded, "cache preloaded from store");
        Ok(loaded)
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.cache.stats(),
            pool: self.pool.stats(),
        }
    }

    /// Closes every pooled connection.
    pub fn shutdown(self) {
        self.pool.close();
        info!("connection pool closed");
    }

    fn checkout(&self) -> std::result::Result<PooledConnection<'_, K::Connection>, PoolError> {
        match self.acquire_timeout {
            Some(timeout) => self.pool.acquire_timeout(timeout),
            None => Ok(self.pool.acquire()),
        }
    }
}

//! Cache Statistics Module
//!
//! Counters reported by `GET /stats`. Entry counts are filled in when a
//! snapshot is taken, so only events are recorded here.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of cache activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped by capacity pressure. Explicit deletes are not counted.
    pub evictions: u64,
    /// Loaded values discarded because the key changed during the load
    pub stale_fills: u64,
    pub total_entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    // == Recording ==
    /// Counts one lookup as a hit or a miss.
    pub fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_stale_fill(&mut self) {
        self.stale_fills += 1;
    }

    /// Copy of the counters with `total_entries` set to `resident`.
    pub fn snapshot(&self, resident: usize) -> Self {
        Self {
            total_entries: resident,
            ..self.clone()
        }
    }

    // == Ratios ==
    /// Fraction of lookups served from the cache; 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }

    /// Fraction of capacity currently resident.
    pub fn occupancy(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.total_entries as f64 / self.capacity as f64
        }
    }
}

//! Cache Module
//!
//! Fixed-capacity in-memory read cache with LRU eviction.

mod entry;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use shared::{EvictionListener, FillTicket, Lookup, SharedCache};
pub use stats::CacheStats;
pub use store::{CacheStore, FillOutcome};

//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

// == Cache Entry ==
/// A resident value together with its position in the recency order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Slot of this key in the [`LruTracker`](super::LruTracker)
    pub(crate) slot: usize,
}

impl CacheEntry {
    pub(crate) fn new(value: String, slot: usize) -> Self {
        Self { value, slot }
    }

    /// Replaces the value, returning the previous one.
    pub(crate) fn replace(&mut self, value: String) -> String {
        std::mem::replace(&mut self.value, value)
    }
}

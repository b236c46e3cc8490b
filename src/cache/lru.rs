//! LRU Tracker Module
//!
//! Implements recency ordering for cache eviction in O(1) per operation.

/// Null link in the node arena.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    key: i64,
    prev: usize,
    next: usize,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys live in an arena-backed doubly-linked list where:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Every tracked key is identified by the slot index returned from
/// [`LruTracker::push_front`]. Callers keep that index next to their value,
/// so promotion and removal never search the list.
#[derive(Debug)]
pub struct LruTracker {
    nodes: Vec<Node>,
    head: usize,
    tail: usize,
    /// Recycled slots
    free: Vec<usize>,
    len: usize,
}

impl Default for LruTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a tracker with room for `capacity` keys before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            free: Vec::new(),
            len: 0,
        }
    }

    // == Push Front ==
    /// Adds a key as the most recently used and returns its slot.
    ///
    /// The tracker does not deduplicate: callers must not push a key that is
    /// already tracked.
    pub fn push_front(&mut self, key: i64) -> usize {
        let node = Node {
            key,
            prev: NIL,
            next: self.head,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
        self.len += 1;
        slot
    }

    // == Promote ==
    /// Marks the key in `slot` as most recently used.
    pub fn promote(&mut self, slot: usize) {
        if self.head == slot {
            return;
        }
        self.unlink(slot);
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }

    // == Remove ==
    /// Removes the key in `slot` from the tracker and returns it.
    pub fn remove(&mut self, slot: usize) -> i64 {
        self.unlink(slot);
        self.free.push(slot);
        self.len -= 1;
        self.nodes[slot].key
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<i64> {
        if self.tail == NIL {
            return None;
        }
        Some(self.remove(self.tail))
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<i64> {
        (self.tail != NIL).then(|| self.nodes[self.tail].key)
    }

    /// Returns the most recently used key.
    pub fn peek_newest(&self) -> Option<i64> {
        (self.head != NIL).then(|| self.nodes[self.head].key)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tracked keys from most to least recently used.
    pub fn keys(&self) -> Vec<i64> {
        let mut keys = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while cursor != NIL {
            keys.push(self.nodes[cursor].key);
            cursor = self.nodes[cursor].next;
        }
        keys
    }

    fn unlink(&mut self, slot: usize) {
        let Node { prev, next, .. } = self.nodes[slot];
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert_eq!(lru.peek_oldest(), None);
    }

    #[test]
    fn test_lru_push_new_keys() {
        let mut lru = LruTracker::new();

        lru.push_front(1);
        lru.push_front(2);
        lru.push_front(3);

        assert_eq!(lru.len(), 3);
        // 1 is oldest (added first)
        assert_eq!(lru.peek_oldest(), Some(1));
        assert_eq!(lru.peek_newest(), Some(3));
        assert_eq!(lru.keys(), vec![3, 2, 1]);
    }

    #[test]
    fn test_lru_promote_existing_key() {
        let mut lru = LruTracker::new();

        let one = lru.push_front(1);
        lru.push_front(2);
        lru.push_front(3);

        lru.promote(one);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some(2));
        assert_eq!(lru.keys(), vec![1, 3, 2]);
    }

    #[test]
    fn test_lru_promote_tail_and_head() {
        let mut lru = LruTracker::new();

        let a = lru.push_front(10);
        let b = lru.push_front(20);

        // Promoting the head is a no-op
        lru.promote(b);
        assert_eq!(lru.keys(), vec![20, 10]);

        lru.promote(a);
        assert_eq!(lru.keys(), vec![10, 20]);
        assert_eq!(lru.peek_oldest(), Some(20));
    }

    #[test]
    fn test_lru_evict_oldest() {
        let mut lru = LruTracker::new();

        lru.push_front(1);
        lru.push_front(2);
        lru.push_front(3);

        assert_eq!(lru.evict_oldest(), Some(1));
        assert_eq!(lru.len(), 2);

        assert_eq!(lru.evict_oldest(), Some(2));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_evict_empty() {
        let mut lru = LruTracker::new();
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_lru_remove_middle() {
        let mut lru = LruTracker::new();

        lru.push_front(1);
        let two = lru.push_front(2);
        lru.push_front(3);

        assert_eq!(lru.remove(two), 2);

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.keys(), vec![3, 1]);
    }

    #[test]
    fn test_lru_remove_only_key() {
        let mut lru = LruTracker::new();

        let slot = lru.push_front(7);
        lru.remove(slot);

        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
        assert_eq!(lru.peek_newest(), None);
    }

    #[test]
    fn test_lru_reuses_freed_slots() {
        let mut lru = LruTracker::with_capacity(2);

        let a = lru.push_front(1);
        lru.push_front(2);
        lru.remove(a);
        let c = lru.push_front(3);

        assert_eq!(c, a);
        assert_eq!(lru.keys(), vec![3, 2]);
    }

    #[test]
    fn test_lru_order_after_multiple_promotions() {
        let mut lru = LruTracker::new();

        // [a]; [b, a]; [c, b, a]
        let a = lru.push_front(1);
        let b = lru.push_front(2);
        let c = lru.push_front(3);

        // [a, c, b]; [c, a, b]; [b, c, a]
        lru.promote(a);
        lru.promote(c);
        lru.promote(b);

        assert_eq!(lru.evict_oldest(), Some(1));
        assert_eq!(lru.evict_oldest(), Some(3));
        assert_eq!(lru.evict_oldest(), Some(2));
        assert!(lru.is_empty());
    }
}

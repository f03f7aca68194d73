//! Recency Index Module
//!
//! Orders keys by last access so the oldest can be evicted in batches.

use std::collections::{BTreeMap, HashMap};

// == Recency Index ==
/// Tracks keys by `(last_access, sequence)`, oldest first.
///
/// The sequence number breaks ties between keys touched in the same
/// millisecond, so ordering always follows touch order.
#[derive(Debug, Default)]
pub struct RecencyIndex {
    order: BTreeMap<(i64, u64), String>,
    positions: HashMap<String, (i64, u64)>,
    next_seq: u64,
}

impl RecencyIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Records an access to `key` at `now_ms`, making it the most recent.
    pub fn touch(&mut self, key: &str, now_ms: i64) {
        self.remove(key);
        let position = (now_ms, self.next_seq);
        self.next_seq += 1;
        self.order.insert(position, key.to_string());
        self.positions.insert(key.to_string(), position);
    }

    // == Remove ==
    /// Removes a key from the index.
    pub fn remove(&mut self, key: &str) {
        if let Some(position) = self.positions.remove(key) {
            self.order.remove(&position);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns up to `count` least recently touched keys,
    /// oldest first.
    pub fn evict_oldest(&mut self, count: usize) -> Vec<String> {
        let mut evicted = Vec::with_capacity(count.min(self.order.len()));
        while evicted.len() < count {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            self.positions.remove(&key);
            evicted.push(key);
        }
        evicted
    }

    // == Peek Oldest ==
    /// Returns the least recently touched key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_new() {
        let index = RecencyIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.peek_oldest(), None);
    }

    #[test]
    fn test_touch_existing_key_moves_it_back() {
        let mut index = RecencyIndex::new();
        index.touch("a", 1);
        index.touch("b", 2);
        index.touch("c", 3);

        index.touch("a", 4);

        assert_eq!(index.len(), 3);
        assert_eq!(index.peek_oldest(), Some("b"));
    }

    #[test]
    fn test_same_millisecond_follows_touch_order() {
        let mut index = RecencyIndex::new();
        index.touch("x", 10);
        index.touch("y", 10);
        index.touch("z", 10);

        assert_eq!(index.evict_oldest(2), vec!["x", "y"]);
        assert_eq!(index.peek_oldest(), Some("z"));
    }

    #[test]
    fn test_evict_more_than_present() {
        let mut index = RecencyIndex::new();
        index.touch("a", 1);

        assert_eq!(index.evict_oldest(5), vec!["a"]);
        assert!(index.is_empty());
        assert!(index.evict_oldest(1).is_empty());
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut index = RecencyIndex::new();
        index.touch("key1", 1);
        index.remove("nonexistent");

        assert_eq!(index.len(), 1);
        assert!(index.contains("key1"));
    }

    #[test]
    fn test_clear() {
        let mut index = RecencyIndex::new();
        index.touch("a", 1);
        index.touch("b", 2);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.peek_oldest(), None);
    }
}

//! Duplicate message suppression
//!
//! A bounded recency store keyed by topic + payload text. This is
//! flood-control, not a correctness structure: eviction removes the oldest
//! half in one batch by insertion order, so an occasional duplicate slipping
//! through right after an eviction is acceptable.

use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

/// Entry count above which a batch eviction runs.
pub const HIGH_WATER: usize = 1000;

/// Number of oldest entries removed per eviction.
pub const EVICT_BATCH: usize = 500;

/// Bounded (topic, payload) recency store.
#[derive(Debug, Default)]
pub struct DedupCache {
    seen: HashMap<String, SystemTime>,
    insertion_order: VecDeque<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Should this message be suppressed as a duplicate?
    ///
    /// With `enabled` false nothing is tracked. A known key suppresses
    /// without refreshing its recency; an unknown key is recorded and let
    /// through, evicting the oldest [`EVICT_BATCH`] entries once the store
    /// exceeds [`HIGH_WATER`].
    pub fn should_suppress(&mut self, topic: &str, payload: &str, enabled: bool) -> bool {
        if !enabled {
            return false;
        }

        let key = format!("{topic}{payload}");
        if self.seen.contains_key(&key) {
            return true;
        }

        self.seen.insert(key.clone(), SystemTime::now());
        self.insertion_order.push_back(key);

        if self.seen.len() > HIGH_WATER {
            for _ in 0..EVICT_BATCH {
                if let Some(oldest) = self.insertion_order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }

        false
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_passes_duplicate_suppressed() {
        let mut cache = DedupCache::new();
        assert!(!cache.should_suppress("a/b", "1", true));
        assert!(cache.should_suppress("a/b", "1", true));
        // Different payload on the same topic passes.
        assert!(!cache.should_suppress("a/b", "2", true));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_disabled_tracks_nothing() {
        let mut cache = DedupCache::new();
        assert!(!cache.should_suppress("a/b", "1", false));
        assert!(!cache.should_suppress("a/b", "1", false));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_removes_oldest_batch() {
        let mut cache = DedupCache::new();
        for i in 0..=HIGH_WATER {
            assert!(!cache.should_suppress("t", &i.to_string(), true));
        }

        // The triggering insert pushed the count to HIGH_WATER + 1, then the
        // batch eviction dropped the oldest EVICT_BATCH entries.
        assert_eq!(cache.len(), HIGH_WATER + 1 - EVICT_BATCH);

        // Oldest half gone: re-inserting is not a duplicate.
        assert!(!cache.should_suppress("t", "0", true));
        assert!(!cache.should_suppress("t", &(EVICT_BATCH - 1).to_string(), true));

        // Newest half retained.
        assert!(cache.should_suppress("t", &EVICT_BATCH.to_string(), true));
        assert!(cache.should_suppress("t", &HIGH_WATER.to_string(), true));
    }

    #[test]
    fn test_cardinality_stays_bounded() {
        let mut cache = DedupCache::new();
        for i in 0..10_000 {
            cache.should_suppress("t", &i.to_string(), true);
            assert!(cache.len() <= HIGH_WATER + 1);
        }
    }
}

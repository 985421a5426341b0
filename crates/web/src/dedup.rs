//! Bounded record of recently seen analytics events.

use std::num::NonZeroUsize;

use lru::LruCache;

/// Maximum number of dedup keys retained.
pub const DEDUP_CAPACITY: usize = 100;

/// Suppresses replayed events. Eviction is by arrival order: once the cache
/// is full the earliest-inserted key is dropped, however recently it was
/// last checked. Lookups use `contains`, which never promotes an entry.
#[derive(Debug)]
pub struct DedupCache {
    seen: LruCache<String, ()>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEDUP_CAPACITY)
    }
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: LruCache::new(cap),
        }
    }

    /// Record `key`. Returns `true` when the key was new, `false` for a
    /// duplicate (which is left in place and not re-ordered).
    pub fn insert(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.put(key.to_string(), ());
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

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
    fn test_duplicate_detected() {
        let mut cache = DedupCache::default();
        assert!(cache.insert("1706400000000_purchase"));
        assert!(!cache.insert("1706400000000_purchase"));
        assert!(cache.insert("1706400000001_purchase"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicts_oldest_inserted() {
        let mut cache = DedupCache::default();
        for i in 0..=DEDUP_CAPACITY {
            assert!(cache.insert(&format!("{i}_view_item")));
        }
        assert_eq!(cache.len(), DEDUP_CAPACITY);
        assert!(!cache.contains("0_view_item"));
        assert!(cache.contains("1_view_item"));
        assert!(cache.contains("100_view_item"));

        // The evicted key is accepted again.
        assert!(cache.insert("0_view_item"));
        assert!(!cache.contains("1_view_item"));
    }

    #[test]
    fn test_duplicate_check_does_not_refresh() {
        let mut cache = DedupCache::new(2);
        cache.insert("a");
        cache.insert("b");
        assert!(!cache.insert("a"));
        cache.insert("c");
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut cache = DedupCache::new(0);
        assert!(cache.insert("a"));
        assert!(!cache.insert("a"));
        assert!(cache.insert("b"));
        assert_eq!(cache.len(), 1);
    }
}

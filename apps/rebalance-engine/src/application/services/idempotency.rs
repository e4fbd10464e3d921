//! Bounded LRU idempotency cache.
//!
//! Maps an idempotency key to the request hash and the result it produced.
//! Not synchronized; owners wrap it in a `Mutex`.

use std::num::NonZeroUsize;

use lru::LruCache;

/// Outcome of looking up a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyLookup<V> {
    /// Key not seen (or evicted).
    Miss,
    /// Key seen with the same request hash.
    Replay(V),
    /// Key seen with a different request hash.
    Conflict {
        /// Hash stored for the key.
        stored_hash: String,
    },
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    request_hash: String,
    value: V,
}

/// Bounded LRU cache keyed by idempotency key.
#[derive(Debug)]
pub struct IdempotencyCache<V> {
    entries: LruCache<String, CacheEntry<V>>,
}

impl<V: Clone> IdempotencyCache<V> {
    /// Create a cache holding at most `capacity` keys (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up `key` against `request_hash`, marking it recently used.
    pub fn lookup(&mut self, key: &str, request_hash: &str) -> IdempotencyLookup<V> {
        match self.entries.get(key) {
            None => IdempotencyLookup::Miss,
            Some(entry) if entry.request_hash == request_hash => {
                IdempotencyLookup::Replay(entry.value.clone())
            }
            Some(entry) => IdempotencyLookup::Conflict {
                stored_hash: entry.request_hash.clone(),
            },
        }
    }

    /// Store a result, evicting the least recently used key when full.
    pub fn insert(&mut self, key: impl Into<String>, request_hash: impl Into<String>, value: V) {
        let entry = CacheEntry {
            request_hash: request_hash.into(),
            value,
        };
        self.entries.put(key.into(), entry);
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached keys.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_replay() {
        let mut cache = IdempotencyCache::new(4);
        assert_eq!(cache.lookup("k1", "h1"), IdempotencyLookup::Miss);
        cache.insert("k1", "h1", 42);
        assert_eq!(cache.lookup("k1", "h1"), IdempotencyLookup::Replay(42));
    }

    #[test]
    fn different_hash_conflicts() {
        let mut cache = IdempotencyCache::new(4);
        cache.insert("k1", "h1", 42);
        assert_eq!(
            cache.lookup("k1", "h2"),
            IdempotencyLookup::Conflict {
                stored_hash: "h1".to_string()
            }
        );
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = IdempotencyCache::new(2);
        cache.insert("k1", "h1", 1);
        cache.insert("k2", "h2", 2);
        // k1 becomes most recent, so k2 is evicted next
        assert_eq!(cache.lookup("k1", "h1"), IdempotencyLookup::Replay(1));
        cache.insert("k3", "h3", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("k2", "h2"), IdempotencyLookup::Miss);
        assert_eq!(cache.lookup("k1", "h1"), IdempotencyLookup::Replay(1));
        assert_eq!(cache.lookup("k3", "h3"), IdempotencyLookup::Replay(3));
    }

    #[test]
    fn zero_capacity_keeps_one_entry() {
        let mut cache = IdempotencyCache::new(0);
        cache.insert("k1", "h1", 1);
        cache.insert("k2", "h2", 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("k1", "h1"), IdempotencyLookup::Miss);
        assert_eq!(cache.lookup("k2", "h2"), IdempotencyLookup::Replay(2));
    }

    #[test]
    fn conflict_lookup_refreshes_recency() {
        let mut cache = IdempotencyCache::new(2);
        cache.insert("k1", "h1", 1);
        cache.insert("k2", "h2", 2);
        assert!(matches!(
            cache.lookup("k1", "other"),
            IdempotencyLookup::Conflict { .. }
        ));
        cache.insert("k3", "h3", 3);

        assert_eq!(cache.lookup("k2", "h2"), IdempotencyLookup::Miss);
        assert_eq!(cache.lookup("k1", "h1"), IdempotencyLookup::Replay(1));
    }

    #[test]
    fn reinsert_does_not_grow() {
        let mut cache = IdempotencyCache::new(2);
        cache.insert("k1", "h1", 1);
        cache.insert("k1", "h1", 1);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }
}

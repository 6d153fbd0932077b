use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Concurrent LRU cache partitioned by key hash. Each shard pairs a recency
/// list with its lookup map behind its own mutex, held only for the O(1)
/// operation body; no operation ever takes two shard locks, so the cache is
/// deadlock-free by construction. Hit counters are relaxed atomics — they
/// feed the health endpoint, nothing else.
pub struct ShardedLruCache<K, V> {
    shards: Vec<Mutex<LruCache<K, V>>>,
    total_queries: AtomicU64,
    hits: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> ShardedLruCache<K, V> {
    pub fn new(total_capacity: usize) -> Self {
        Self::with_shards(total_capacity, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(total_capacity: usize, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let per_shard = (total_capacity / shard_count).max(1);
        // max(1) keeps this nonzero
        let capacity = NonZeroUsize::new(per_shard).expect("per-shard capacity is nonzero");
        let shards = (0..shard_count).map(|_| Mutex::new(LruCache::new(capacity))).collect();
        Self { shards, total_queries: AtomicU64::new(0), hits: AtomicU64::new(0) }
    }

    fn shard(&self, key: &K) -> &Mutex<LruCache<K, V>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % self.shards.len()]
    }

    /// Clone of the cached value; refreshes the entry's recency on hit.
    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).lock().get(key).cloned()
    }

    /// Insert or update; the shard evicts its least-recently-used entry
    /// when full.
    pub fn put(&self, key: K, value: V) {
        self.shard(&key).lock().put(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    pub fn record_query(&self, hit: bool) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total_queries.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.hits.load(Ordering::Relaxed) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_miss_then_hit() {
        let cache: ShardedLruCache<String, String> = ShardedLruCache::new(100);
        assert_eq!(cache.get(&"q".to_string()), None);
        cache.put("q".to_string(), "result".to_string());
        assert_eq!(cache.get(&"q".to_string()), Some("result".to_string()));
    }

    #[test]
    fn put_updates_existing_value() {
        let cache: ShardedLruCache<String, String> = ShardedLruCache::new(100);
        cache.put("q".to_string(), "old".to_string());
        cache.put("q".to_string(), "new".to_string());
        assert_eq!(cache.get(&"q".to_string()), Some("new".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lru_eviction_in_a_single_shard() {
        // one shard so every key shares a recency list
        let cache: ShardedLruCache<String, String> = ShardedLruCache::with_shards(2, 1);
        cache.put("a".into(), "1".into());
        cache.put("b".into(), "2".into());
        cache.put("a".into(), "1".into());
        cache.put("c".into(), "3".into());

        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), Some("1".to_string()));
        assert_eq!(cache.get(&"c".to_string()), Some("3".to_string()));
    }

    #[test]
    fn capacity_bounds_shard_size() {
        let cache: ShardedLruCache<u32, u32> = ShardedLruCache::with_shards(8, 4);
        for i in 0..1000 {
            cache.put(i, i);
        }
        // per-shard capacity is 2, so 4 shards hold at most 8 entries
        assert!(cache.len() <= 8);
    }

    #[test]
    fn tiny_capacity_still_gets_one_slot_per_shard() {
        let cache: ShardedLruCache<u32, u32> = ShardedLruCache::with_shards(4, 16);
        for i in 0..64 {
            cache.put(i, i);
        }
        assert!(cache.len() <= 16);
    }

    #[test]
    fn hit_rate_tracks_recorded_queries() {
        let cache: ShardedLruCache<String, String> = ShardedLruCache::new(10);
        assert_eq!(cache.hit_rate(), 0.0);
        cache.record_query(true);
        cache.record_query(true);
        cache.record_query(false);
        cache.record_query(false);
        let rate = cache.hit_rate();
        assert!((0.0..=1.0).contains(&rate));
        assert!((rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn clear_empties_every_shard() {
        let cache: ShardedLruCache<u32, u32> = ShardedLruCache::new(100);
        for i in 0..50 {
            cache.put(i, i);
        }
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_access_is_safe() {
        use std::sync::Arc;
        let cache: Arc<ShardedLruCache<u32, u32>> = Arc::new(ShardedLruCache::new(64));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..500u32 {
                        cache.put(t * 1000 + i, i);
                        cache.get(&(t * 1000 + i));
                        cache.record_query(i % 2 == 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.hit_rate() >= 0.0 && cache.hit_rate() <= 1.0);
    }
}

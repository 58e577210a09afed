use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use crate::clock::Clock;

/// Cached value with its expiry time
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: i64,
}

/// Generic keyed memoization with per-entry time-to-live.
///
/// An entry older than its TTL is treated as absent and recomputed. Two
/// requests racing on the same cold key may each compute once; the compute
/// functions used here are pure, so both arrive at the same value and the
/// last insert wins. The guard from the read lookup is dropped before the
/// compute/insert path runs, so a recompute never deadlocks against its own
/// shard lock.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_secs,
            clock,
        }
    }

    /// Return the cached value for `key` if still live, otherwise invoke
    /// `compute`, store the result, and return it.
    pub fn get_or_compute<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = self.clock.now_unix();

        if let Some(entry) = self.entries.get(&key) {
            if now < entry.expires_at {
                return entry.value.clone();
            }
        }

        let value = compute();
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: now + self.ttl_secs,
            },
        );
        value
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

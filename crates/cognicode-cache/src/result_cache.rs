use crate::cache::{AccessRecord, CacheConfig, CacheEntry, CacheStats, Clock, SystemClock};
use cognicode_core::Fingerprint;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Fingerprint-keyed store of formatted results with TTL expiry and an
/// entry-count bound enforced by LRU eviction.
///
/// All state sits behind one mutex. Critical sections only touch the map,
/// so callers must never perform analysis work while holding a borrow of it
/// (the API makes that impossible: values go in and come out by clone).
pub struct ResultCache<V> {
    state: Mutex<CacheState<V>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

struct CacheState<V> {
    entries: HashMap<Fingerprint, CacheEntry<V>>,
    sequence: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> CacheState<V> {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

impl<V: Clone> ResultCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(mut config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        config.capacity = config.capacity.max(1);
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(config.capacity.min(4096)),
                sequence: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns a copy of the live value for `key`. Expired entries are
    /// removed in the same critical section and reported as absent.
    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let sequence = state.next_sequence();

        let expired = match state.entries.get_mut(key) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) if entry.is_expired(now, self.config.ttl) => true,
            Some(entry) => {
                entry.touch(now, sequence);
                let value = entry.value.clone();
                state.hits += 1;
                return Some(value);
            }
        };

        if expired {
            state.entries.remove(key);
            state.expirations += 1;
            state.misses += 1;
            trace!(fingerprint = ?key, "Dropped expired cache entry on read");
        }
        None
    }

    /// Inserts or overwrites `key`. Concurrent writers are serialized by the
    /// cache lock, so the last writer wins. Afterwards the entry count is
    /// brought back to capacity by evicting least recently used entries.
    pub fn put(&self, key: Fingerprint, value: V) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let sequence = state.next_sequence();
        state
            .entries
            .insert(key, CacheEntry::new(key, value, now, sequence));

        while state.entries.len() > self.config.capacity {
            let victim = state
                .entries
                .values()
                .filter(|entry| entry.key != key)
                .min_by_key(|entry| entry.eviction_key())
                .map(|entry| entry.key);

            match victim {
                Some(victim) => {
                    state.entries.remove(&victim);
                    state.evictions += 1;
                    debug!(fingerprint = ?victim, "Evicted least recently used cache entry");
                }
                None => break,
            }
        }
    }

    /// Removes every entry whose age has reached the TTL.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        let removed = before - state.entries.len();
        state.expirations += removed as u64;
        removed
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.sequence = 0;
        state.hits = 0;
        state.misses = 0;
        state.evictions = 0;
        state.expirations = 0;
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut most_accessed: Vec<AccessRecord> = state
            .entries
            .values()
            .map(|entry| AccessRecord {
                fingerprint: entry.key.to_hex(),
                access_count: entry.access_count,
            })
            .collect();
        most_accessed.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        most_accessed.truncate(self.config.top_k);

        CacheStats {
            entry_count: state.entries.len(),
            capacity: self.config.capacity,
            ttl_secs: self.config.ttl.as_secs(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
            most_accessed,
        }
    }
}

/// Periodically purges expired entries until the returned handle is aborted.
pub fn spawn_expiry_sweeper<V>(cache: Arc<ResultCache<V>>, every: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(10)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                debug!(removed, "Expired cache entries purged");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn cache_with(capacity: usize, ttl_secs: u64) -> (ResultCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = CacheConfig {
            capacity,
            ttl: Duration::from_secs(ttl_secs),
            ..CacheConfig::default()
        };
        (ResultCache::with_clock(config, clock.clone()), clock)
    }

    fn key(name: &str) -> Fingerprint {
        Fingerprint::of(name)
    }

    #[test]
    fn ttl_boundary_hits_then_expires() {
        let (cache, clock) = cache_with(10, 60);
        cache.put(key("a"), "A".into());

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(&key("a")).as_deref(), Some("A"));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn lru_keeps_recently_read_entry() {
        let (cache, clock) = cache_with(3, 600);
        for name in ["a", "b", "c"] {
            cache.put(key(name), name.to_uppercase());
            clock.advance(Duration::from_secs(1));
        }
        assert!(cache.get(&key("a")).is_some());
        clock.advance(Duration::from_secs(1));
        cache.put(key("d"), "D".into());

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("c")).is_some());
        assert!(cache.get(&key("d")).is_some());
    }

    #[test]
    fn eviction_is_deterministic_with_frozen_clock() {
        let (cache, _clock) = cache_with(3, 600);
        cache.put(key("a"), "A".into());
        cache.put(key("b"), "B".into());
        cache.put(key("c"), "C".into());
        cache.get(&key("a"));
        cache.put(key("d"), "D".into());

        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn overwrite_keeps_single_entry_and_latest_value() {
        let (cache, _clock) = cache_with(2, 600);
        cache.put(key("a"), "old".into());
        cache.put(key("a"), "new".into());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("a")).as_deref(), Some("new"));
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let (cache, clock) = cache_with(10, 60);
        cache.put(key("old"), "old".into());
        clock.advance(Duration::from_secs(30));
        cache.put(key("young"), "young".into());
        clock.advance(Duration::from_secs(30));

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get(&key("old")).is_none());
        assert!(cache.get(&key("young")).is_some());
    }

    #[test]
    fn stats_list_most_accessed_first() {
        let (cache, _clock) = cache_with(10, 600);
        cache.put(key("a"), "A".into());
        cache.put(key("b"), "B".into());
        for _ in 0..3 {
            cache.get(&key("b"));
        }
        cache.get(&key("a"));
        cache.get(&key("missing"));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.most_accessed[0].fingerprint, key("b").to_hex());
        assert_eq!(stats.most_accessed[0].access_count, 3);
    }

    #[test]
    fn clear_empties_everything() {
        let (cache, _clock) = cache_with(10, 600);
        cache.put(key("a"), "A".into());
        cache.get(&key("a"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn sweeper_purges_in_background() {
        let (cache, clock) = cache_with(10, 60);
        let cache = Arc::new(cache);
        cache.put(key("a"), "A".into());
        clock.advance(Duration::from_secs(61));

        let handle = spawn_expiry_sweeper(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cache.is_empty());
        handle.abort();
    }
}

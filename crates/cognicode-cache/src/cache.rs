use cognicode_core::Fingerprint;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Source of "now" for expiry and recency decisions.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to exercise TTL boundaries.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

/// Cache entry metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: Fingerprint,
    pub value: T,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    /// Logical recency stamp, bumped on insert and on every hit.
    pub(crate) sequence: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(key: Fingerprint, value: T, now: Instant, sequence: u64) -> Self {
        Self {
            key,
            value,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            sequence,
        }
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    pub fn touch(&mut self, now: Instant, sequence: u64) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
        self.access_count += 1;
        self.sequence = sequence;
    }

    /// Eviction order: least recently used first, then least accessed.
    pub(crate) fn eviction_key(&self) -> (Instant, u64, u64) {
        (self.last_accessed, self.access_count, self.sequence)
    }
}

/// Cache configuration options
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
    pub cleanup_interval: Duration,
    /// How many entries `stats()` lists under `most_accessed`
    pub top_k: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
            top_k: 5,
        }
    }
}

impl From<&cognicode_core::CacheSettings> for CacheConfig {
    fn from(settings: &cognicode_core::CacheSettings) -> Self {
        Self {
            capacity: settings.capacity.max(1),
            ttl: settings.ttl(),
            cleanup_interval: settings.cleanup_interval(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRecord {
    pub fingerprint: String,
    pub access_count: u64,
}

/// Cache performance statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub most_accessed: Vec<AccessRecord>,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_request() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);
        clock.advance(Duration::from_secs(59));
        assert_eq!(clock.now() - start, Duration::from_secs(59));
    }

    #[test]
    fn touch_never_moves_last_access_backwards() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(10));
        let mut entry = CacheEntry::new(Fingerprint::of("x"), 1u8, clock.now(), 1);
        entry.touch(start, 2);
        assert_eq!(entry.last_accessed, start + Duration::from_secs(10));
        assert_eq!(entry.access_count, 1);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let clock = ManualClock::new();
        let entry = CacheEntry::new(Fingerprint::of("x"), (), clock.now(), 1);
        let ttl = Duration::from_secs(60);
        clock.advance(Duration::from_secs(59));
        assert!(!entry.is_expired(clock.now(), ttl));
        clock.advance(Duration::from_secs(1));
        assert!(entry.is_expired(clock.now(), ttl));
    }

    #[test]
    fn hit_rate_handles_empty_stats() {
        let stats = CacheStats {
            entry_count: 0,
            capacity: 1,
            ttl_secs: 1,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            most_accessed: Vec::new(),
        };
        assert_eq!(stats.hit_rate(), 0.0);
    }
}

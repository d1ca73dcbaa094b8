use crate::coordinator::SessionCoordinator;
use chrono::{DateTime, Utc};
use cognicode_agents::{DefaultWorkerFactory, PoolConfig, WorkerFactory, WorkerPool};
use cognicode_cache::{CacheConfig, ResultCache};
use cognicode_core::{AnalysisReport, CogniCodeConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CogniCodeConfig>,
    pub cache: Arc<ResultCache<AnalysisReport>>,
    pub pool: Arc<WorkerPool>,
    pub coordinator: Arc<SessionCoordinator>,
    pub sessions: Arc<SessionMetrics>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds the cache, pool and coordinator once for the whole process.
    /// A pool that fails to initialize is logged and left for the health
    /// endpoint to report; workers are retried lazily on first use.
    pub fn new(config: CogniCodeConfig) -> Self {
        Self::with_factory(config, Arc::new(DefaultWorkerFactory::default()))
    }

    pub fn with_factory(config: CogniCodeConfig, factory: Arc<dyn WorkerFactory>) -> Self {
        let cache = Arc::new(ResultCache::new(CacheConfig::from(&config.cache)));
        let pool = Arc::new(WorkerPool::new(factory, PoolConfig::from(&config.pool)));

        match pool.initialize() {
            Ok(()) => info!("Agent pool initialized"),
            Err(err) => error!(error = %err, "Agent pool failed to initialize"),
        }

        Self::from_parts(config, cache, pool)
    }

    pub fn from_parts(
        config: CogniCodeConfig,
        cache: Arc<ResultCache<AnalysisReport>>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        let sessions = Arc::new(SessionMetrics::default());
        let coordinator = Arc::new(SessionCoordinator::new(
            cache.clone(),
            pool.clone(),
            sessions.clone(),
            config.limits.max_code_bytes,
            config.server.max_connections,
        ));

        Self {
            config: Arc::new(config),
            cache,
            pool,
            coordinator,
            sessions,
            started_at: Utc::now(),
        }
    }
}

/// Connected session counters.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub total: AtomicUsize,
}

impl SessionMetrics {
    /// Reserves a slot unless `max` sessions are already active.
    pub fn try_admit(&self, max: usize) -> bool {
        let admitted = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                (active < max).then_some(active + 1)
            });
        let now = match admitted {
            Ok(previous) => previous + 1,
            Err(_) => return false,
        };
        self.total.fetch_add(1, Ordering::Relaxed);

        let mut peak = self.peak.load(Ordering::Relaxed);
        while now > peak
            && self
                .peak
                .compare_exchange(peak, now, Ordering::Relaxed, Ordering::Relaxed)
                .is_err()
        {
            peak = self.peak.load(Ordering::Relaxed);
        }
        true
    }

    pub fn release(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| active.checked_sub(1));
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_stops_at_max() {
        let metrics = SessionMetrics::default();
        assert!(metrics.try_admit(2));
        assert!(metrics.try_admit(2));
        assert!(!metrics.try_admit(2));

        metrics.release();
        assert!(metrics.try_admit(2));
        assert_eq!(metrics.active(), 2);
        assert_eq!(metrics.peak(), 2);
        assert_eq!(metrics.total(), 3);
    }

    #[test]
    fn release_never_underflows() {
        let metrics = SessionMetrics::default();
        metrics.release();
        assert_eq!(metrics.active(), 0);
    }

    #[test]
    fn composition_root_initializes_pool() {
        let state = AppState::new(CogniCodeConfig::default());
        assert!(state.pool.is_initialized());
        assert_eq!(state.pool.status().linter_agents, 1);
        assert!(state.cache.is_empty());
    }
}

// ABOUTME: Capability-keyed worker pool with lazy creation and one-shot init retry.
// ABOUTME: Also tracks which transport sessions are connected for status reporting.
use crate::worker::{WorkerFactory, WorkerHandle, WorkerStatus};
use chrono::{DateTime, Utc};
use cognicode_core::{Capability, CogniCodeError, Result};
use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound for `grow`.
    pub max_workers_per_capability: usize,
    /// When set, `acquire` grows a capability whose workers are all busy.
    pub grow_on_contention: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers_per_capability: 3,
            grow_on_contention: false,
        }
    }
}

impl From<&cognicode_core::PoolSettings> for PoolConfig {
    fn from(settings: &cognicode_core::PoolSettings) -> Self {
        Self {
            max_workers_per_capability: settings.max_workers_per_capability.max(1),
            grow_on_contention: settings.grow_on_contention,
        }
    }
}

/// Snapshot served by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub linter_agents: usize,
    pub refactor_agents: usize,
    pub testgen_agents: usize,
    pub active_connections: usize,
    pub initialized: bool,
}

impl PoolStatus {
    pub fn worker_count(&self, capability: Capability) -> usize {
        match capability {
            Capability::Lint => self.linter_agents,
            Capability::Refactor => self.refactor_agents,
            Capability::TestGen => self.testgen_agents,
        }
    }
}

/// One row of the agents status listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub id: String,
    pub name: String,
    pub status: WorkerStatus,
    pub capabilities: Vec<String>,
    pub model: String,
    pub last_run: Option<DateTime<Utc>>,
}

pub struct WorkerPool {
    factory: Arc<dyn WorkerFactory>,
    config: PoolConfig,
    workers: RwLock<HashMap<Capability, Vec<Arc<WorkerHandle>>>>,
    creation_locks: HashMap<Capability, Mutex<()>>,
    init_lock: Mutex<()>,
    initialized: AtomicBool,
    sessions: DashSet<String>,
}

impl WorkerPool {
    pub fn new(factory: Arc<dyn WorkerFactory>, config: PoolConfig) -> Self {
        Self {
            factory,
            config,
            workers: RwLock::new(HashMap::new()),
            creation_locks: Capability::ALL
                .iter()
                .map(|capability| (*capability, Mutex::new(())))
                .collect(),
            init_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
            sessions: DashSet::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Creates and initializes one worker per capability. Concurrent and
    /// repeated calls are no-ops once the first call has succeeded.
    pub fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.init_lock.lock();
        if self.is_initialized() {
            return Ok(());
        }

        info!("Initializing worker pool");
        for capability in Capability::ALL {
            self.acquire(capability)?;
        }
        self.initialized.store(true, Ordering::Release);
        info!("Worker pool ready");
        Ok(())
    }

    /// Returns a ready worker for `capability`, creating the first one on
    /// demand. Handles found in the error state are re-initialized once.
    pub fn acquire(&self, capability: Capability) -> Result<Arc<WorkerHandle>> {
        let handle = match self.select(capability) {
            Some(handle) => handle,
            None => self.create_first(capability)?,
        };

        let handle = if self.config.grow_on_contention && handle.is_busy() {
            match self.grow(capability) {
                Ok(_) => self.select(capability).unwrap_or(handle),
                Err(_) => handle,
            }
        } else {
            handle
        };

        if handle.status() == WorkerStatus::Error {
            warn!(%capability, index = handle.index(), "Worker in error state; re-initializing");
            handle
                .initialize()
                .map_err(|err| CogniCodeError::WorkerInitialization {
                    capability,
                    reason: err.to_string(),
                })?;
        }
        Ok(handle)
    }

    /// Adds one more worker for `capability` and returns the new count.
    pub fn grow(&self, capability: Capability) -> Result<usize> {
        let _creating = self.creation_lock(capability)?.lock();
        let count = self.worker_count(capability);
        if count >= self.config.max_workers_per_capability {
            return Err(CogniCodeError::Pool(format!(
                "{} already has {} workers (limit {})",
                capability, count, self.config.max_workers_per_capability
            )));
        }

        let handle = self.spawn_worker(capability, count)?;
        let mut workers = self.workers.write();
        let entry = workers.entry(capability).or_default();
        entry.push(handle);
        info!(%capability, workers = entry.len(), "Worker pool grown");
        Ok(entry.len())
    }

    pub fn worker_count(&self, capability: Capability) -> usize {
        self.workers.read().get(&capability).map_or(0, Vec::len)
    }

    pub fn handles(&self, capability: Capability) -> Vec<Arc<WorkerHandle>> {
        self.workers
            .read()
            .get(&capability)
            .cloned()
            .unwrap_or_default()
    }

    pub fn track_session(&self, session_id: impl Into<String>) -> bool {
        self.sessions.insert(session_id.into())
    }

    pub fn untrack_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            linter_agents: self.worker_count(Capability::Lint),
            refactor_agents: self.worker_count(Capability::Refactor),
            testgen_agents: self.worker_count(Capability::TestGen),
            active_connections: self.active_sessions(),
            initialized: self.is_initialized(),
        }
    }

    /// Per-capability status of the primary worker. Read-only: a capability
    /// with no worker yet is reported as idle.
    pub fn agent_statuses(&self) -> Vec<AgentStatus> {
        Capability::ALL
            .iter()
            .map(|&capability| {
                let primary = self.handles(capability).into_iter().next();
                AgentStatus {
                    id: capability.id().to_string(),
                    name: capability.display_name().to_string(),
                    status: primary.as_ref().map_or(WorkerStatus::Idle, |h| h.status()),
                    capabilities: capability.features().iter().map(|f| f.to_string()).collect(),
                    model: primary
                        .as_ref()
                        .map_or(capability.model_name(), |h| h.model_name())
                        .to_string(),
                    last_run: primary.as_ref().and_then(|h| h.last_run_at()),
                }
            })
            .collect()
    }

    /// Drops every worker. A later `initialize` or `acquire` starts over.
    pub fn shutdown(&self) {
        let _guard = self.init_lock.lock();
        let dropped: usize = self.workers.write().drain().map(|(_, v)| v.len()).sum();
        self.initialized.store(false, Ordering::Release);
        info!(workers = dropped, "Worker pool shut down");
    }

    fn select(&self, capability: Capability) -> Option<Arc<WorkerHandle>> {
        let workers = self.workers.read();
        let handles = workers.get(&capability)?;
        handles
            .iter()
            .find(|handle| !handle.is_busy())
            .or_else(|| handles.first())
            .cloned()
    }

    fn creation_lock(&self, capability: Capability) -> Result<&Mutex<()>> {
        self.creation_locks
            .get(&capability)
            .ok_or_else(|| CogniCodeError::Pool(format!("no creation lock for {}", capability)))
    }

    fn create_first(&self, capability: Capability) -> Result<Arc<WorkerHandle>> {
        let _creating = self.creation_lock(capability)?.lock();
        if let Some(existing) = self.select(capability) {
            return Ok(existing);
        }

        let handle = self.spawn_worker(capability, 0)?;
        self.workers
            .write()
            .entry(capability)
            .or_default()
            .push(handle.clone());
        Ok(handle)
    }

    /// Builds and initializes a worker, retrying initialization once.
    fn spawn_worker(&self, capability: Capability, index: usize) -> Result<Arc<WorkerHandle>> {
        let handle = Arc::new(WorkerHandle::new(index, self.factory.create(capability)));

        if let Err(first) = handle.initialize() {
            warn!(%capability, error = %first, "Worker initialization failed; retrying once");
            handle
                .initialize()
                .map_err(|err| CogniCodeError::WorkerInitialization {
                    capability,
                    reason: err.to_string(),
                })?;
        }
        info!(%capability, index, model = handle.model_name(), "Worker ready");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{DefaultWorkerFactory, WorkOutput, WorkRequest, Worker};
    use cognicode_core::Language;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    fn pool() -> WorkerPool {
        WorkerPool::new(Arc::new(DefaultWorkerFactory::default()), PoolConfig::default())
    }

    /// Fails the first `failures` initializations across all its workers.
    struct FlakyFactory {
        failures: Arc<AtomicUsize>,
    }

    struct FlakyWorker {
        capability: Capability,
        failures: Arc<AtomicUsize>,
    }

    impl Worker for FlakyWorker {
        fn capability(&self) -> Capability {
            self.capability
        }

        fn model_name(&self) -> &str {
            "flaky"
        }

        fn initialize(&mut self) -> Result<()> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(CogniCodeError::Worker("model download failed".into()));
            }
            Ok(())
        }

        fn process(&mut self, _request: &WorkRequest) -> Result<WorkOutput> {
            Ok(WorkOutput::Tests(Vec::new()))
        }
    }

    impl WorkerFactory for FlakyFactory {
        fn create(&self, capability: Capability) -> Box<dyn Worker> {
            Box::new(FlakyWorker {
                capability,
                failures: self.failures.clone(),
            })
        }
    }

    fn flaky_pool(failures: usize) -> WorkerPool {
        WorkerPool::new(
            Arc::new(FlakyFactory {
                failures: Arc::new(AtomicUsize::new(failures)),
            }),
            PoolConfig::default(),
        )
    }

    #[test]
    fn initialize_creates_one_worker_per_capability() {
        let pool = pool();
        pool.initialize().unwrap();
        pool.initialize().unwrap();

        let status = pool.status();
        assert!(status.initialized);
        for capability in Capability::ALL {
            assert_eq!(status.worker_count(capability), 1);
        }
    }

    #[test]
    fn acquire_creates_lazily_and_reuses() {
        let pool = pool();
        let first = pool.acquire(Capability::Refactor).unwrap();
        let second = pool.acquire(Capability::Refactor).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.worker_count(Capability::Lint), 0);
        assert!(!pool.is_initialized());
    }

    #[test]
    fn single_init_failure_is_retried() {
        let pool = flaky_pool(1);
        let handle = pool.acquire(Capability::TestGen).unwrap();
        assert_eq!(handle.status(), WorkerStatus::Ready);
    }

    #[test]
    fn double_init_failure_is_a_pool_error() {
        let pool = flaky_pool(2);
        let err = pool.initialize().unwrap_err();
        assert!(matches!(
            err,
            CogniCodeError::WorkerInitialization {
                capability: Capability::Lint,
                ..
            }
        ));
        assert!(!pool.is_initialized());
        // the next attempt succeeds once the factory recovers
        pool.initialize().unwrap();
    }

    #[test]
    fn errored_worker_is_recovered_on_acquire() {
        let pool = pool();
        let handle = pool.acquire(Capability::Lint).unwrap();
        let mismatched = WorkRequest::GenerateTests {
            code: "x".into(),
            language: Language::Python,
            functions: Vec::new(),
        };
        assert!(handle.run(&mismatched).is_err());
        assert_eq!(handle.status(), WorkerStatus::Error);

        let again = pool.acquire(Capability::Lint).unwrap();
        assert!(Arc::ptr_eq(&handle, &again));
        assert_eq!(again.status(), WorkerStatus::Ready);
    }

    #[test]
    fn grow_is_bounded() {
        let pool = WorkerPool::new(
            Arc::new(DefaultWorkerFactory::default()),
            PoolConfig {
                max_workers_per_capability: 2,
                ..PoolConfig::default()
            },
        );
        pool.acquire(Capability::Lint).unwrap();
        assert_eq!(pool.grow(Capability::Lint).unwrap(), 2);
        assert!(matches!(pool.grow(Capability::Lint), Err(CogniCodeError::Pool(_))));
        assert_eq!(pool.handles(Capability::Lint)[1].index(), 1);
    }

    #[test]
    fn sessions_are_tracked() {
        let pool = pool();
        assert!(pool.track_session("a"));
        assert!(!pool.track_session("a"));
        pool.track_session("b");
        assert_eq!(pool.status().active_connections, 2);
        assert!(pool.untrack_session("a"));
        assert!(!pool.untrack_session("a"));
        assert_eq!(pool.active_sessions(), 1);
    }

    #[test]
    fn agent_statuses_list_every_capability() {
        let pool = pool();
        pool.initialize().unwrap();
        let statuses = pool.agent_statuses();
        let ids: Vec<&str> = statuses.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["linter", "refactor", "testgen"]);
        assert!(statuses.iter().all(|s| s.status == WorkerStatus::Ready));
        assert!(statuses.iter().all(|s| s.last_run.is_none()));
    }

    #[test]
    fn agent_statuses_do_not_create_or_recover_workers() {
        let pool = pool();
        let statuses = pool.agent_statuses();
        assert!(statuses.iter().all(|s| s.status == WorkerStatus::Idle));
        assert_eq!(statuses[0].model, Capability::Lint.model_name());
        for capability in Capability::ALL {
            assert_eq!(pool.worker_count(capability), 0);
        }

        let handle = pool.acquire(Capability::Lint).unwrap();
        let mismatched = WorkRequest::GenerateTests {
            code: "x".into(),
            language: Language::Python,
            functions: Vec::new(),
        };
        assert!(handle.run(&mismatched).is_err());

        let statuses = pool.agent_statuses();
        assert_eq!(statuses[0].status, WorkerStatus::Error);
        assert!(statuses[0].last_run.is_some());
        assert_eq!(handle.status(), WorkerStatus::Error);
        assert_eq!(pool.worker_count(Capability::Refactor), 0);
    }

    /// Signals when `process` starts, then blocks until the test releases it.
    struct GateFactory {
        entered: mpsc::Sender<()>,
        release: Arc<Mutex<()>>,
    }

    struct GateWorker {
        capability: Capability,
        entered: mpsc::Sender<()>,
        release: Arc<Mutex<()>>,
    }

    impl Worker for GateWorker {
        fn capability(&self) -> Capability {
            self.capability
        }

        fn model_name(&self) -> &str {
            "gate"
        }

        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        fn process(&mut self, _request: &WorkRequest) -> Result<WorkOutput> {
            let _ = self.entered.send(());
            drop(self.release.lock());
            Ok(WorkOutput::Analysis(Default::default()))
        }
    }

    impl WorkerFactory for GateFactory {
        fn create(&self, capability: Capability) -> Box<dyn Worker> {
            Box::new(GateWorker {
                capability,
                entered: self.entered.clone(),
                release: self.release.clone(),
            })
        }
    }

    /// Keeps the first lint worker busy and returns what `acquire` hands out
    /// meanwhile.
    fn acquire_while_busy(settings: &cognicode_core::PoolSettings) -> (usize, usize) {
        let (entered, started) = mpsc::channel();
        let release = Arc::new(Mutex::new(()));
        let pool = Arc::new(WorkerPool::new(
            Arc::new(GateFactory {
                entered,
                release: release.clone(),
            }),
            PoolConfig::from(settings),
        ));
        let first = pool.acquire(Capability::Lint).unwrap();

        let held = release.lock();
        let runner = {
            let first = first.clone();
            std::thread::spawn(move || {
                first.run(&WorkRequest::Analyze {
                    code: "x".into(),
                    language: Language::JavaScript,
                })
            })
        };
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(first.is_busy());

        let second = pool.acquire(Capability::Lint).unwrap();
        drop(held);
        runner.join().unwrap().unwrap();
        (second.index(), pool.worker_count(Capability::Lint))
    }

    #[test]
    fn configured_contention_growth_adds_a_worker() {
        let settings: cognicode_core::PoolSettings =
            serde_json::from_str(r#"{"max_workers_per_capability": 2, "grow_on_contention": true}"#)
                .unwrap();
        assert_eq!(acquire_while_busy(&settings), (1, 2));

        let settings: cognicode_core::PoolSettings =
            serde_json::from_str(r#"{"max_workers_per_capability": 2}"#).unwrap();
        assert!(!settings.grow_on_contention);
        assert_eq!(acquire_while_busy(&settings), (0, 1));
    }

    #[test]
    fn shutdown_drops_workers() {
        let pool = pool();
        pool.initialize().unwrap();
        pool.shutdown();
        assert_eq!(pool.status().linter_agents, 0);
        assert!(!pool.is_initialized());
    }
}

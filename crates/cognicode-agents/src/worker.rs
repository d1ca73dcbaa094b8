use crate::pipeline::{panic_message, AnalysisPipeline};
use chrono::{DateTime, Utc};
use cognicode_core::{
    AnalysisResult, Capability, CogniCodeError, FunctionInfo, Issue, Language, Result, Suggestion,
    TestCase,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One unit of work for a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkRequest {
    Analyze {
        code: String,
        language: Language,
    },
    Refactor {
        code: String,
        language: Language,
        issues: Vec<Issue>,
    },
    GenerateTests {
        code: String,
        language: Language,
        functions: Vec<FunctionInfo>,
    },
}

impl WorkRequest {
    pub fn capability(&self) -> Capability {
        match self {
            WorkRequest::Analyze { .. } => Capability::Lint,
            WorkRequest::Refactor { .. } => Capability::Refactor,
            WorkRequest::GenerateTests { .. } => Capability::TestGen,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            WorkRequest::Analyze { code, .. }
            | WorkRequest::Refactor { code, .. }
            | WorkRequest::GenerateTests { code, .. } => code,
        }
    }

    pub fn language(&self) -> &Language {
        match self {
            WorkRequest::Analyze { language, .. }
            | WorkRequest::Refactor { language, .. }
            | WorkRequest::GenerateTests { language, .. } => language,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkOutput {
    Analysis(AnalysisResult),
    Suggestions(Vec<Suggestion>),
    Tests(Vec<TestCase>),
}

/// A capability-specific analyzer. `process` is only ever called by one
/// thread at a time; the owning [`WorkerHandle`] serializes access.
pub trait Worker: Send {
    fn capability(&self) -> Capability;

    fn model_name(&self) -> &str;

    /// Loads whatever the worker needs. Called once after construction and
    /// again when recovering from the error state.
    fn initialize(&mut self) -> Result<()>;

    fn process(&mut self, request: &WorkRequest) -> Result<WorkOutput>;
}

#[derive(Debug, Clone)]
struct LoadedModel {
    name: String,
}

/// Default worker: a named model slot in front of the shared pipeline.
pub struct AgentWorker {
    capability: Capability,
    model_name: String,
    model: Option<LoadedModel>,
    pipeline: Arc<AnalysisPipeline>,
}

impl AgentWorker {
    pub fn new(capability: Capability, pipeline: Arc<AnalysisPipeline>) -> Self {
        Self {
            capability,
            model_name: capability.model_name().to_string(),
            model: None,
            pipeline,
        }
    }
}

impl Worker for AgentWorker {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn initialize(&mut self) -> Result<()> {
        info!(capability = %self.capability, model = %self.model_name, "Loading model");
        self.model = Some(LoadedModel {
            name: self.model_name.clone(),
        });
        Ok(())
    }

    fn process(&mut self, request: &WorkRequest) -> Result<WorkOutput> {
        let model = self.model.as_ref().ok_or_else(|| {
            CogniCodeError::Worker(format!("{} worker is not initialized", self.capability))
        })?;
        if request.capability() != self.capability {
            return Err(CogniCodeError::InvalidOperation(format!(
                "{} worker cannot serve {} requests",
                self.capability,
                request.capability()
            )));
        }
        debug!(capability = %self.capability, model = %model.name, "Processing request");
        Ok(self.pipeline.run(request))
    }
}

/// Builds workers for the pool.
pub trait WorkerFactory: Send + Sync {
    fn create(&self, capability: Capability) -> Box<dyn Worker>;
}

pub struct DefaultWorkerFactory {
    pipeline: Arc<AnalysisPipeline>,
}

impl DefaultWorkerFactory {
    pub fn new(pipeline: Arc<AnalysisPipeline>) -> Self {
        Self { pipeline }
    }
}

impl Default for DefaultWorkerFactory {
    fn default() -> Self {
        Self::new(Arc::new(AnalysisPipeline::default()))
    }
}

impl WorkerFactory for DefaultWorkerFactory {
    fn create(&self, capability: Capability) -> Box<dyn Worker> {
        Box::new(AgentWorker::new(capability, self.pipeline.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Initializing,
    Ready,
    Running,
    Error,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Initializing => "initializing",
            WorkerStatus::Ready => "ready",
            WorkerStatus::Running => "running",
            WorkerStatus::Error => "error",
        }
    }
}

#[derive(Debug)]
struct HandleState {
    status: WorkerStatus,
    last_run_at: Option<DateTime<Utc>>,
}

/// Shared handle to one worker. Runs on the same handle are serialized by
/// the worker mutex; status is tracked separately so readers never wait on a
/// running analysis.
pub struct WorkerHandle {
    capability: Capability,
    index: usize,
    model_name: String,
    worker: Mutex<Box<dyn Worker>>,
    state: Mutex<HandleState>,
    runs: AtomicU64,
    transition_violations: AtomicU64,
}

impl WorkerHandle {
    pub fn new(index: usize, worker: Box<dyn Worker>) -> Self {
        Self {
            capability: worker.capability(),
            index,
            model_name: worker.model_name().to_string(),
            worker: Mutex::new(worker),
            state: Mutex::new(HandleState {
                status: WorkerStatus::Idle,
                last_run_at: None,
            }),
            runs: AtomicU64::new(0),
            transition_violations: AtomicU64::new(0),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn status(&self) -> WorkerStatus {
        self.state.lock().status
    }

    pub fn last_run_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_run_at
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Status changes that did not start from an allowed state. Stays at
    /// zero unless two runs overlapped on this handle.
    pub fn transition_violations(&self) -> u64 {
        self.transition_violations.load(Ordering::Relaxed)
    }

    /// Whether a run or initialization currently holds the worker.
    pub fn is_busy(&self) -> bool {
        self.worker.is_locked()
    }

    fn transition(&self, allowed_from: &[WorkerStatus], to: WorkerStatus) {
        let mut state = self.state.lock();
        if !allowed_from.contains(&state.status) {
            self.transition_violations.fetch_add(1, Ordering::Relaxed);
            warn!(
                capability = %self.capability,
                index = self.index,
                from = state.status.as_str(),
                to = to.as_str(),
                "Unexpected worker status transition"
            );
        }
        state.status = to;
    }

    pub fn initialize(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        self.transition(
            &[WorkerStatus::Idle, WorkerStatus::Error],
            WorkerStatus::Initializing,
        );
        match self.contain("initialize", || worker.initialize()) {
            Ok(()) => {
                self.transition(&[WorkerStatus::Initializing], WorkerStatus::Ready);
                Ok(())
            }
            Err(err) => {
                self.transition(&[WorkerStatus::Initializing], WorkerStatus::Error);
                Err(err)
            }
        }
    }

    /// Runs a worker call, turning a panic into a worker error so the
    /// status update after it still happens.
    fn contain<T>(&self, stage: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            error!(capability = %self.capability, index = self.index, stage, %reason, "Worker panicked");
            Err(CogniCodeError::Worker(format!(
                "{} worker panicked during {}: {}",
                self.capability, stage, reason
            )))
        })
    }

    /// Blocking. Callers on an async runtime go through `spawn_blocking`.
    pub fn run(&self, request: &WorkRequest) -> Result<WorkOutput> {
        let mut worker = self.worker.lock();
        self.transition(&[WorkerStatus::Ready], WorkerStatus::Running);
        self.runs.fetch_add(1, Ordering::Relaxed);

        let result = self.contain("process", || worker.process(request));

        let mut state = self.state.lock();
        if state.status != WorkerStatus::Running {
            self.transition_violations.fetch_add(1, Ordering::Relaxed);
        }
        state.status = if result.is_ok() {
            WorkerStatus::Ready
        } else {
            WorkerStatus::Error
        };
        state.last_run_at = Some(Utc::now());
        result
    }
}

// ABOUTME: Drives one client request through cache lookup, pooled worker, formatting and cache store.
// ABOUTME: Every request ends in exactly one terminal event on the session's sink.
use crate::error::RequestError;
use crate::instrument::{instrument, RequestMetrics};
use crate::protocol::{
    AnalyzeRequest, ClientMessage, Connected, RefactorRequest, ServerEvent, TestsRequest,
};
use crate::state::SessionMetrics;
use chrono::Utc;
use cognicode_agents::{format_issues, format_suggestions, format_tests, WorkOutput, WorkRequest, WorkerPool};
use cognicode_cache::ResultCache;
use cognicode_core::{AnalysisReport, AnalysisResult, Capability, CogniCodeError, Fingerprint, Language};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};
use uuid::Uuid;

/// Where a session's events go.
pub trait EventSink: Send + Sync {
    /// Returns false once the session is gone.
    fn emit(&self, event: ServerEvent) -> bool;
}

impl EventSink for UnboundedSender<ServerEvent> {
    fn emit(&self, event: ServerEvent) -> bool {
        self.send(event).is_ok()
    }
}

pub struct SessionCoordinator {
    cache: Arc<ResultCache<AnalysisReport>>,
    pool: Arc<WorkerPool>,
    sessions: Arc<SessionMetrics>,
    metrics: RequestMetrics,
    max_code_bytes: usize,
    max_connections: usize,
}

impl SessionCoordinator {
    pub fn new(
        cache: Arc<ResultCache<AnalysisReport>>,
        pool: Arc<WorkerPool>,
        sessions: Arc<SessionMetrics>,
        max_code_bytes: usize,
        max_connections: usize,
    ) -> Self {
        Self {
            cache,
            pool,
            sessions,
            metrics: RequestMetrics::default(),
            max_code_bytes,
            max_connections,
        }
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Admits a new session and greets it. At capacity the sink receives an
    /// error instead and the caller should close the connection.
    pub fn connect(&self, sink: &dyn EventSink) -> Result<String, RequestError> {
        if !self.sessions.try_admit(self.max_connections) {
            info!(max_connections = self.max_connections, "Rejecting session: server at capacity");
            sink.emit(ServerEvent::error(RequestError::AtCapacity.to_string()));
            return Err(RequestError::AtCapacity);
        }

        let session_id = Uuid::new_v4().to_string();
        self.pool.track_session(session_id.clone());
        info!(session_id = %session_id, active = self.pool.active_sessions(), "Session connected");

        sink.emit(ServerEvent::Connected(Connected {
            session_id: session_id.clone(),
            server_time: Utc::now(),
            message: "Connected to CogniCode Agents".to_string(),
        }));
        Ok(session_id)
    }

    /// Idempotent.
    pub fn disconnect(&self, session_id: &str) {
        if self.pool.untrack_session(session_id) {
            self.sessions.release();
            info!(session_id, active = self.pool.active_sessions(), "Session disconnected");
        }
    }

    /// Reports a frame that could not be parsed.
    pub fn reject_frame(&self, session_id: &str, sink: &dyn EventSink) {
        debug!(session_id, "Rejecting malformed frame");
        sink.emit(ServerEvent::error(RequestError::InvalidFormat.to_string()));
    }

    /// Runs one request and emits its terminal event.
    pub async fn handle(&self, session_id: &str, message: ClientMessage, sink: &dyn EventSink) {
        let operation = message.name();
        let outcome = match message {
            ClientMessage::AnalyzeCode(request) => {
                instrument(&self.metrics, operation, session_id, self.analyze(request, sink)).await
            }
            ClientMessage::GenerateRefactoring(request) => {
                instrument(&self.metrics, operation, session_id, self.refactor(request)).await
            }
            ClientMessage::GenerateTests(request) => {
                instrument(&self.metrics, operation, session_id, self.generate_tests(request)).await
            }
            ClientMessage::Disconnect => {
                self.disconnect(session_id);
                return;
            }
        };

        let terminal = outcome.unwrap_or_else(|err| ServerEvent::error(err.to_string()));
        if !sink.emit(terminal) {
            debug!(session_id, operation, "Session closed before the result was delivered");
        }
    }

    pub async fn analyze(
        &self,
        request: AnalyzeRequest,
        sink: &dyn EventSink,
    ) -> Result<ServerEvent, RequestError> {
        self.check_size(&request.code)?;
        let code = request.code.trim().to_string();
        let language = request.language;

        if code.is_empty() {
            let fingerprint = Fingerprint::of("");
            return Ok(ServerEvent::AnalysisComplete(analysis_report(
                AnalysisResult::empty(),
                &fingerprint,
                language,
            )));
        }

        let fingerprint = Fingerprint::of(&code);
        if let Some(report) = self.cache.get(&fingerprint) {
            if report.language == language {
                debug!(fingerprint = %fingerprint.to_hex(), "Serving cached analysis");
                return Ok(ServerEvent::AnalysisComplete(report));
            }
        }

        sink.emit(ServerEvent::progress(25, "Starting analysis..."));
        let work = WorkRequest::Analyze {
            code,
            language: language.clone(),
        };
        let result = match self.dispatch(work, sink).await? {
            WorkOutput::Analysis(result) => result,
            other => return Err(unexpected_output("Analysis", &other)),
        };

        sink.emit(ServerEvent::progress(75, "Processing results..."));
        let report = analysis_report(result, &fingerprint, language);
        self.cache.put(fingerprint, report.clone());

        sink.emit(ServerEvent::progress(100, "Analysis complete!"));
        Ok(ServerEvent::AnalysisComplete(report))
    }

    pub async fn refactor(&self, request: RefactorRequest) -> Result<ServerEvent, RequestError> {
        self.check_size(&request.code)?;
        let code = request.code.trim().to_string();
        if code.is_empty() {
            return Err(RequestError::MissingCode("refactoring"));
        }

        let work = WorkRequest::Refactor {
            code,
            language: request.language,
            issues: request.analysis,
        };
        match self.dispatch(work, &NoProgress).await? {
            WorkOutput::Suggestions(suggestions) => {
                Ok(ServerEvent::RefactorSuggestions(format_suggestions(suggestions)))
            }
            other => Err(unexpected_output("Refactoring", &other)),
        }
    }

    pub async fn generate_tests(&self, request: TestsRequest) -> Result<ServerEvent, RequestError> {
        self.check_size(&request.code)?;
        let code = request.code.trim().to_string();
        if code.is_empty() {
            return Err(RequestError::MissingCode("test generation"));
        }

        let work = WorkRequest::GenerateTests {
            code,
            language: request.language,
            functions: request.functions,
        };
        match self.dispatch(work, &NoProgress).await? {
            WorkOutput::Tests(tests) => Ok(ServerEvent::TestCasesGenerated(format_tests(tests))),
            other => Err(unexpected_output("Test generation", &other)),
        }
    }

    fn check_size(&self, code: &str) -> Result<(), RequestError> {
        if code.len() > self.max_code_bytes {
            return Err(RequestError::CodeTooLarge {
                size: code.len(),
                limit: self.max_code_bytes,
            });
        }
        Ok(())
    }

    /// Acquires a worker and runs the request on the blocking pool.
    async fn dispatch(&self, work: WorkRequest, sink: &dyn EventSink) -> Result<WorkOutput, RequestError> {
        let capability = work.capability();
        let operation = operation_name(capability);

        let pool = self.pool.clone();
        let handle = tokio::task::spawn_blocking(move || pool.acquire(capability))
            .await
            .map_err(|_| RequestError::Cancelled(operation))?
            .map_err(RequestError::agent(operation))?;

        if capability == Capability::Lint {
            sink.emit(ServerEvent::progress(50, "Running linter analysis..."));
        }

        tokio::task::spawn_blocking(move || handle.run(&work))
            .await
            .map_err(|_| RequestError::Cancelled(operation))?
            .map_err(RequestError::agent(operation))
    }
}

struct NoProgress;

impl EventSink for NoProgress {
    fn emit(&self, _event: ServerEvent) -> bool {
        true
    }
}

fn operation_name(capability: Capability) -> &'static str {
    match capability {
        Capability::Lint => "Analysis",
        Capability::Refactor => "Refactoring",
        Capability::TestGen => "Test generation",
    }
}

fn unexpected_output(operation: &'static str, output: &WorkOutput) -> RequestError {
    let kind = match output {
        WorkOutput::Analysis(_) => "analysis",
        WorkOutput::Suggestions(_) => "suggestions",
        WorkOutput::Tests(_) => "tests",
    };
    RequestError::Agent {
        operation,
        source: CogniCodeError::Worker(format!("worker returned {} output", kind)),
    }
}

/// Stamps a lint result with its identity and the agent that produced it.
pub fn analysis_report(
    result: AnalysisResult,
    fingerprint: &Fingerprint,
    language: Language,
) -> AnalysisReport {
    AnalysisReport {
        issues: format_issues(result.issues),
        metrics: result.metrics,
        functions: result.functions,
        insights: result.insights,
        fingerprint: fingerprint.to_hex(),
        language,
        degraded: result.degraded,
        agent: Capability::Lint.display_name().to_string(),
        model: Capability::Lint.model_name().to_string(),
        timestamp: Utc::now(),
    }
}

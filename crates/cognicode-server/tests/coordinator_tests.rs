use cognicode_agents::{Worker, WorkerFactory, WorkerStatus, WorkOutput, WorkRequest};
use cognicode_core::{Capability, CogniCodeConfig, CogniCodeError, Issue, Language, Result, Severity};
use cognicode_server::{
    AnalyzeRequest, AppState, ClientMessage, EventSink, RefactorRequest, ServerEvent, TestsRequest,
};
use std::sync::{Arc, Mutex};

const JS_SAMPLE: &str = "var x = 1;\nif (x == 1) { console.log(x); }";

#[derive(Default)]
struct Collector {
    events: Mutex<Vec<ServerEvent>>,
}

impl EventSink for Collector {
    fn emit(&self, event: ServerEvent) -> bool {
        self.events.lock().unwrap().push(event);
        true
    }
}

impl Collector {
    fn take(&self) -> Vec<ServerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

fn state() -> AppState {
    AppState::new(CogniCodeConfig::default())
}

fn analyze(code: &str, language: Language) -> ClientMessage {
    ClientMessage::AnalyzeCode(AnalyzeRequest {
        code: code.to_string(),
        language,
    })
}

fn progress_values(events: &[ServerEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::AnalysisProgress(p) => Some(p.progress),
            _ => None,
        })
        .collect()
}

fn terminal_count(events: &[ServerEvent]) -> usize {
    events.iter().filter(|event| event.is_terminal()).count()
}

#[tokio::test]
async fn empty_analysis_completes_with_zero_complexity() {
    let state = state();
    let sink = Collector::default();

    state
        .coordinator
        .handle("s1", analyze("   \n\t ", Language::JavaScript), &sink)
        .await;

    let events = sink.take();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::AnalysisComplete(report) => {
            assert!(report.issues.is_empty());
            assert!(report.functions.is_empty());
            assert_eq!(report.metrics.complexity, 0);
        }
        other => panic!("expected analysis_complete, got {:?}", other),
    }
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn analysis_reports_progress_then_caches() {
    let state = state();
    let sink = Collector::default();

    state
        .coordinator
        .handle("s1", analyze(JS_SAMPLE, Language::JavaScript), &sink)
        .await;
    let first = sink.take();
    assert_eq!(progress_values(&first), vec![25, 50, 75, 100]);
    assert_eq!(terminal_count(&first), 1);

    let report = match first.last() {
        Some(ServerEvent::AnalysisComplete(report)) => report.clone(),
        other => panic!("expected analysis_complete, got {:?}", other),
    };
    let categories: Vec<&str> = report.issues.iter().map(|r| r.item.category.as_str()).collect();
    assert_eq!(categories, vec!["eqeqeq", "no-var", "no-console"]);
    assert!(report.metrics.complexity >= 2);
    assert_eq!(report.agent, "Linter Agent");
    assert_eq!(state.cache.len(), 1);

    // Surrounding whitespace does not change the fingerprint.
    let padded = format!("\n\n{}   \n", JS_SAMPLE);
    state
        .coordinator
        .handle("s1", analyze(&padded, Language::JavaScript), &sink)
        .await;
    let second = sink.take();
    assert_eq!(second, vec![ServerEvent::AnalysisComplete(report)]);
    assert_eq!(state.cache.stats().hits, 1);
    assert_eq!(state.pool.handles(Capability::Lint)[0].runs(), 1);
}

#[tokio::test]
async fn cached_report_for_other_language_is_recomputed() {
    let state = state();
    let sink = Collector::default();
    let code = "print(value == None)";

    state
        .coordinator
        .handle("s1", analyze(code, Language::JavaScript), &sink)
        .await;
    state
        .coordinator
        .handle("s1", analyze(code, Language::Python), &sink)
        .await;

    let events = sink.take();
    let languages: Vec<Language> = events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::AnalysisComplete(report) => Some(report.language.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(languages, vec![Language::JavaScript, Language::Python]);
    assert_eq!(state.pool.handles(Capability::Lint)[0].runs(), 2);
    assert_eq!(state.cache.len(), 1);
}

#[tokio::test]
async fn oversized_code_is_rejected_before_any_work() {
    let mut config = CogniCodeConfig::default();
    config.limits.max_code_bytes = 16;
    let state = AppState::new(config);
    let sink = Collector::default();

    state
        .coordinator
        .handle("s1", analyze("const message = 'far too long';", Language::JavaScript), &sink)
        .await;

    assert_eq!(sink.take(), vec![ServerEvent::error("Code exceeds maximum size limit")]);
    assert!(state.cache.is_empty());
    assert_eq!(state.cache.stats().misses, 0);
    assert_eq!(state.pool.handles(Capability::Lint)[0].runs(), 0);
}

#[tokio::test]
async fn blank_refactor_and_test_requests_are_rejected() {
    let state = state();
    let sink = Collector::default();

    state
        .coordinator
        .handle(
            "s1",
            ClientMessage::GenerateRefactoring(RefactorRequest {
                code: "  ".into(),
                language: Language::Python,
                analysis: Vec::new(),
            }),
            &sink,
        )
        .await;
    state
        .coordinator
        .handle(
            "s1",
            ClientMessage::GenerateTests(TestsRequest {
                code: String::new(),
                language: Language::Python,
                functions: Vec::new(),
            }),
            &sink,
        )
        .await;

    assert_eq!(
        sink.take(),
        vec![
            ServerEvent::error("No code provided for refactoring"),
            ServerEvent::error("No code provided for test generation"),
        ]
    );
}

#[tokio::test]
async fn refactor_applies_client_lint_issues() {
    let state = state();
    let sink = Collector::default();
    let issues = vec![
        Issue::new(Severity::Warning, 1, "Use let or const instead of var")
            .with_category("no-var")
            .fixable(),
    ];

    state
        .coordinator
        .handle(
            "s1",
            ClientMessage::GenerateRefactoring(RefactorRequest {
                code: JS_SAMPLE.into(),
                language: Language::JavaScript,
                analysis: issues,
            }),
            &sink,
        )
        .await;

    let events = sink.take();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::RefactorSuggestions(suggestions) => {
            assert!(!suggestions.is_empty());
            let scores: Vec<u8> = suggestions.iter().map(|s| s.item.impact_score).collect();
            let mut sorted = scores.clone();
            sorted.sort_by(|a, b| b.cmp(a));
            assert_eq!(scores, sorted);
        }
        other => panic!("expected refactor_suggestions, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generation_extracts_functions() {
    let state = state();
    let sink = Collector::default();

    state
        .coordinator
        .handle(
            "s1",
            ClientMessage::GenerateTests(TestsRequest {
                code: "def add(a, b):\n    return a + b\n".into(),
                language: Language::Python,
                functions: Vec::new(),
            }),
            &sink,
        )
        .await;

    match sink.take().as_slice() {
        [ServerEvent::TestCasesGenerated(tests)] => {
            assert!(!tests.is_empty());
            assert!(tests.iter().all(|t| t.item.framework == "pytest"));
            assert!(tests.windows(2).all(|w| w[0].item.priority >= w[1].item.priority));
        }
        other => panic!("expected test_cases_generated, got {:?}", other),
    }
}

#[tokio::test]
async fn sessions_are_capped_and_released() {
    let mut config = CogniCodeConfig::default();
    config.server.max_connections = 1;
    let state = AppState::new(config);
    let sink = Collector::default();

    let session = state.coordinator.connect(&sink).unwrap();
    assert!(state.coordinator.connect(&sink).is_err());
    assert_eq!(state.pool.status().active_connections, 1);

    let events = sink.take();
    assert!(matches!(&events[0], ServerEvent::Connected(c) if c.session_id == session));
    assert_eq!(events[1], ServerEvent::error("Server at capacity"));

    state.coordinator.disconnect(&session);
    state.coordinator.disconnect(&session);
    assert_eq!(state.pool.status().active_connections, 0);
    assert_eq!(state.sessions.active(), 0);
    assert!(state.coordinator.connect(&sink).is_ok());
}

struct BrokenFactory;

struct BrokenWorker(Capability);

impl Worker for BrokenWorker {
    fn capability(&self) -> Capability {
        self.0
    }

    fn model_name(&self) -> &str {
        "broken"
    }

    fn initialize(&mut self) -> Result<()> {
        Err(CogniCodeError::Worker("weights unavailable".into()))
    }

    fn process(&mut self, _request: &WorkRequest) -> Result<WorkOutput> {
        Err(CogniCodeError::Worker("not loaded".into()))
    }
}

impl WorkerFactory for BrokenFactory {
    fn create(&self, capability: Capability) -> Box<dyn Worker> {
        Box::new(BrokenWorker(capability))
    }
}

#[tokio::test]
async fn worker_failure_becomes_single_error_event() {
    let state = AppState::with_factory(CogniCodeConfig::default(), Arc::new(BrokenFactory));
    assert!(!state.pool.is_initialized());
    let sink = Collector::default();

    state
        .coordinator
        .handle("s1", analyze(JS_SAMPLE, Language::JavaScript), &sink)
        .await;

    let events = sink.take();
    assert_eq!(terminal_count(&events), 1);
    match events.last() {
        Some(ServerEvent::Error(payload)) => assert!(payload.message.starts_with("Analysis failed:")),
        other => panic!("expected error, got {:?}", other),
    }
    assert!(state.cache.is_empty());
    assert_eq!(state.coordinator.metrics().failed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_analyses_each_get_one_report() {
    let state = state();
    let sinks: Vec<Collector> = (0..50).map(|_| Collector::default()).collect();
    let codes: Vec<String> = (0..50)
        .map(|n| format!("var v{n} = {n};\nif (v{n} == 1) {{ console.log(v{n}); }}"))
        .collect();

    let requests = sinks.iter().zip(&codes).enumerate().map(|(n, (sink, code))| {
        let coordinator = state.coordinator.clone();
        let session = format!("s{n}");
        async move {
            coordinator
                .handle(&session, analyze(code, Language::JavaScript), sink)
                .await
        }
    });
    futures_util::future::join_all(requests).await;

    for sink in &sinks {
        let events = sink.take();
        assert_eq!(terminal_count(&events), 1);
        assert_eq!(progress_values(&events), vec![25, 50, 75, 100]);
        match events.last() {
            Some(ServerEvent::AnalysisComplete(report)) => assert_eq!(report.issues.len(), 3),
            other => panic!("expected analysis_complete, got {:?}", other),
        }
    }

    let handles = state.pool.handles(Capability::Lint);
    assert_eq!(handles.iter().map(|h| h.runs()).sum::<u64>(), 50);
    assert!(handles.iter().all(|h| h.transition_violations() == 0));
    assert!(handles.iter().all(|h| h.status() == WorkerStatus::Ready));
    assert_eq!(state.cache.len(), 50);
    assert_eq!(state.coordinator.metrics().handled(), 50);
    assert_eq!(state.coordinator.metrics().failed(), 0);
}

/// Refactor workers panic on their first request, then behave.
struct PanicOnceFactory;

struct PanicOnceWorker {
    capability: Capability,
    panicked: bool,
}

impl Worker for PanicOnceWorker {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn model_name(&self) -> &str {
        "panic-once"
    }

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, _request: &WorkRequest) -> Result<WorkOutput> {
        if !self.panicked {
            self.panicked = true;
            panic!("line 0 is out of range");
        }
        Ok(WorkOutput::Suggestions(Vec::new()))
    }
}

impl WorkerFactory for PanicOnceFactory {
    fn create(&self, capability: Capability) -> Box<dyn Worker> {
        Box::new(PanicOnceWorker {
            capability,
            panicked: false,
        })
    }
}

#[tokio::test]
async fn panicking_worker_reports_failure_and_recovers() {
    let state = AppState::with_factory(CogniCodeConfig::default(), Arc::new(PanicOnceFactory));
    let sink = Collector::default();
    let refactor = || {
        ClientMessage::GenerateRefactoring(RefactorRequest {
            code: JS_SAMPLE.into(),
            language: Language::JavaScript,
            analysis: Vec::new(),
        })
    };

    state.coordinator.handle("s1", refactor(), &sink).await;
    match sink.take().as_slice() {
        [ServerEvent::Error(payload)] => {
            assert!(payload.message.starts_with("Refactoring failed:"));
            assert!(payload.message.contains("line 0 is out of range"));
        }
        other => panic!("expected one error event, got {:?}", other),
    }
    let handle = state.pool.handles(Capability::Refactor)[0].clone();
    assert_eq!(handle.status(), WorkerStatus::Error);

    state.coordinator.handle("s1", refactor(), &sink).await;
    assert_eq!(sink.take(), vec![ServerEvent::RefactorSuggestions(Vec::new())]);
    assert_eq!(handle.status(), WorkerStatus::Ready);
    assert_eq!(handle.runs(), 2);
}

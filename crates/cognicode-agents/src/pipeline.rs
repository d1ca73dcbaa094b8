// ABOUTME: Runs normalize -> rule set -> semantic insights -> ranking for one request.
// ABOUTME: Stateless apart from the rule registry, so one instance is shared by every worker.
use crate::insights::semantic_insights;
use crate::normalize::{is_blank, line_count, normalize};
use crate::ranking::{rank_issues, rank_suggestions, rank_tests};
use crate::refactor::generate_suggestions;
use crate::rules::{RuleError, RuleOutput, RuleRegistry};
use crate::testgen::generate_tests;
use crate::worker::{WorkOutput, WorkRequest};
use cognicode_core::{
    AnalysisResult, FunctionInfo, Insights, Issue, Language, MetricSet, Severity, Suggestion,
    TestCase,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

pub struct AnalysisPipeline {
    rules: RuleRegistry,
}

impl AnalysisPipeline {
    pub fn new(rules: RuleRegistry) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn run(&self, request: &WorkRequest) -> WorkOutput {
        match request {
            WorkRequest::Analyze { code, language } => WorkOutput::Analysis(self.lint(code, language)),
            WorkRequest::Refactor {
                code,
                language,
                issues,
            } => WorkOutput::Suggestions(self.refactor(code, language, issues)),
            WorkRequest::GenerateTests {
                code,
                language,
                functions,
            } => WorkOutput::Tests(self.generate_tests(code, language, functions)),
        }
    }

    /// Lint pass. Blank input yields an empty result; a failing rule set
    /// yields a degraded result carrying one synthetic error issue.
    pub fn lint(&self, code: &str, language: &Language) -> AnalysisResult {
        if is_blank(code) {
            return AnalysisResult::empty();
        }
        let code = normalize(code);
        let rule_set = self.rules.resolve(language);

        let (output, degraded) = match guarded(|| rule_set.analyze(&code)) {
            Ok(output) => (output, false),
            Err(reason) => {
                warn!(rule_set = rule_set.name(), %reason, "Rule set failed; returning degraded analysis");
                (
                    RuleOutput {
                        issues: vec![Issue::new(
                            Severity::Error,
                            1,
                            format!("Analysis failed: {}", reason),
                        )
                        .with_suggestion("Check code syntax and try again")
                        .with_category("analysis-failure")],
                        metrics: MetricSet::new(1, 10, line_count(&code)),
                        functions: Vec::new(),
                    },
                    true,
                )
            }
        };

        let insights = catch_unwind(AssertUnwindSafe(|| {
            semantic_insights(&code, language, &output.functions)
        }))
        .unwrap_or_else(|payload| {
            warn!(reason = %panic_message(payload.as_ref()), "Semantic pass failed; omitting insights");
            Insights::default()
        });
        let mut issues = output.issues;
        rank_issues(&mut issues);

        debug!(
            language = %language,
            issues = issues.len(),
            functions = output.functions.len(),
            degraded,
            "Lint pass finished"
        );

        AnalysisResult {
            issues,
            metrics: output.metrics,
            functions: output.functions,
            insights,
            degraded,
        }
    }

    pub fn refactor(&self, code: &str, language: &Language, issues: &[Issue]) -> Vec<Suggestion> {
        if is_blank(code) {
            return Vec::new();
        }
        let code = normalize(code);
        let functions = self.functions_of(&code, language);
        let mut suggestions = generate_suggestions(&code, language, &functions, issues);
        rank_suggestions(&mut suggestions);
        suggestions
    }

    /// Test generation. Functions supplied by the client take precedence over
    /// extraction.
    pub fn generate_tests(
        &self,
        code: &str,
        language: &Language,
        functions: &[FunctionInfo],
    ) -> Vec<TestCase> {
        if is_blank(code) {
            return Vec::new();
        }
        let code = normalize(code);
        let extracted;
        let functions = if functions.is_empty() {
            extracted = self.functions_of(&code, language);
            &extracted
        } else {
            functions
        };
        let mut tests = generate_tests(&code, language, functions);
        rank_tests(&mut tests);
        tests
    }

    fn functions_of(&self, code: &str, language: &Language) -> Vec<FunctionInfo> {
        let rule_set = self.rules.resolve(language);
        guarded(|| Ok(rule_set.extract_functions(code))).unwrap_or_default()
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new(RuleRegistry::with_defaults())
    }
}

/// Runs a rule-set call, turning both errors and panics into a reason string.
fn guarded<T>(f: impl FnOnce() -> Result<T, RuleError>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

use cognicode_agents::rules::{RuleError, RuleOutput, RuleRegistry, RuleSet};
use cognicode_agents::{format_issues, format_suggestions, format_tests, AnalysisPipeline};
use cognicode_core::{FunctionInfo, Language, MetricSet, Severity, SuggestionKind, TestKind};
use std::sync::Arc;

const JS_SAMPLE: &str = "var x = 1;\nif (x == 1) { console.log(x); }";

const PY_SAMPLE: &str = r#"
def fib(n):
    if n <= 1:
        return n
    return fib(n - 1) + fib(n - 2)

def total(items):
    result = 0
    for item in items:
        result += fib(item)
    return result
"#;

#[test]
fn javascript_sample_reports_expected_issues() {
    let pipeline = AnalysisPipeline::default();
    let result = pipeline.lint(JS_SAMPLE, &Language::JavaScript);

    let summary: Vec<(Severity, u32, &str, bool)> = result
        .issues
        .iter()
        .map(|i| (i.severity, i.line, i.category.as_str(), i.fixable))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Severity::Warning, 2, "eqeqeq", true),
            (Severity::Warning, 1, "no-var", true),
            (Severity::Info, 2, "no-console", false),
        ]
    );
    assert!(!result.degraded);
    assert_eq!(result.metrics.complexity, 2);
}

#[test]
fn python_analysis_is_idempotent() {
    let pipeline = AnalysisPipeline::default();
    let first = pipeline.lint(PY_SAMPLE, &Language::Python);
    let second = pipeline.lint(PY_SAMPLE, &Language::Python);
    assert_eq!(first, second);

    let names: Vec<&str> = first.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["fib", "total"]);
    // normalization drops the leading blank line
    assert_eq!(first.functions[0].start_line, 1);

    let ids_a: Vec<String> = format_issues(first.issues).into_iter().map(|r| r.id).collect();
    let ids_b: Vec<String> = format_issues(second.issues).into_iter().map(|r| r.id).collect();
    assert_eq!(ids_a, ids_b);
    assert_eq!(first.insights.performance_suggestions.len(), 1);
}

#[test]
fn blank_input_is_empty_for_every_capability() {
    let pipeline = AnalysisPipeline::default();
    let result = pipeline.lint("  \n\t", &Language::Python);
    assert!(result.issues.is_empty());
    assert_eq!(result.metrics.lines_of_code, 0);
    assert!(pipeline.refactor("", &Language::JavaScript, &[]).is_empty());
    assert!(pipeline.generate_tests(" ", &Language::JavaScript, &[]).is_empty());
}

struct BrokenRules;

impl RuleSet for BrokenRules {
    fn name(&self) -> &str {
        "broken"
    }

    fn analyze(&self, _code: &str) -> Result<RuleOutput, RuleError> {
        Err(RuleError::Failed {
            rule_set: "broken".into(),
            reason: "grammar not loaded".into(),
        })
    }
}

struct PanickingRules;

impl RuleSet for PanickingRules {
    fn name(&self) -> &str {
        "panicking"
    }

    fn analyze(&self, _code: &str) -> Result<RuleOutput, RuleError> {
        panic!("index out of range")
    }
}

/// Reports a function whose end line precedes its start line.
struct InvertedRangeRules;

impl RuleSet for InvertedRangeRules {
    fn name(&self) -> &str {
        "inverted"
    }

    fn analyze(&self, _code: &str) -> Result<RuleOutput, RuleError> {
        Ok(RuleOutput {
            issues: Vec::new(),
            metrics: MetricSet::new(1, 100, 1),
            functions: vec![FunctionInfo::new("f", 9, 2)],
        })
    }
}

fn pipeline_with(language: Language, rules: Arc<dyn RuleSet>) -> AnalysisPipeline {
    let mut registry = RuleRegistry::with_defaults();
    registry.register(language, rules);
    AnalysisPipeline::new(registry)
}

#[test]
fn failing_rule_set_degrades_instead_of_erroring() {
    let pipeline = pipeline_with(Language::JavaScript, Arc::new(BrokenRules));
    let result = pipeline.lint("eval(x);", &Language::JavaScript);

    assert!(result.degraded);
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, Severity::Error);
    assert!(result.issues[0].message.contains("grammar not loaded"));
    // the semantic pass still ran
    assert_eq!(result.insights.security_concerns.len(), 1);
}

#[test]
fn inverted_function_range_does_not_break_the_semantic_pass() {
    let pipeline = pipeline_with(Language::Python, Arc::new(InvertedRangeRules));
    let result = pipeline.lint("def f():\n    pass\n", &Language::Python);
    assert!(!result.degraded);
    assert_eq!(result.functions.len(), 1);
    assert!(result.insights.code_smells.is_empty());
}

#[test]
fn panicking_rule_set_degrades_instead_of_crashing() {
    let pipeline = pipeline_with(Language::Java, Arc::new(PanickingRules));
    let result = pipeline.lint("class A {}", &Language::Java);
    assert!(result.degraded);
    assert!(result.issues[0].message.contains("index out of range"));
}

#[test]
fn refactor_output_is_ranked_and_stable() {
    let pipeline = AnalysisPipeline::default();
    let a = format_suggestions(pipeline.refactor(PY_SAMPLE, &Language::Python, &[]));
    let b = format_suggestions(pipeline.refactor(PY_SAMPLE, &Language::Python, &[]));
    assert_eq!(a, b);

    assert_eq!(a[0].item.kind, SuggestionKind::Performance);
    assert!(a
        .windows(2)
        .all(|pair| pair[0].item.impact_score >= pair[1].item.impact_score));
}

#[test]
fn tests_are_generated_from_extracted_functions() {
    let pipeline = AnalysisPipeline::default();
    let tests = format_tests(pipeline.generate_tests(PY_SAMPLE, &Language::Python, &[]));

    assert!(tests.iter().all(|t| t.item.framework == "pytest"));
    assert!(tests
        .windows(2)
        .all(|pair| pair[0].item.priority >= pair[1].item.priority));
    assert!(tests.iter().any(|t| t.item.kind == TestKind::Performance));
    assert!(tests.iter().any(|t| t.item.kind == TestKind::Integration));
}

#[test]
fn client_supplied_functions_take_precedence() {
    let pipeline = AnalysisPipeline::default();
    let supplied = vec![FunctionInfo::new("onlyThis", 1, 1)];
    let tests = pipeline.generate_tests(JS_SAMPLE, &Language::JavaScript, &supplied);
    assert!(tests.iter().all(|t| t.name.contains("onlyThis")));
}

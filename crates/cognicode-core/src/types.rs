use crate::ids::Ranked;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source language of a submitted snippet. Unknown names are kept verbatim
/// and routed to the generic analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Other(String),
}

impl Language {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "jsx" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "python" | "py" => Language::Python,
            "java" => Language::Java,
            other => Language::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Other(name) => name.as_str(),
        }
    }

    pub fn is_javascript_family(&self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::JavaScript
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Language::parse(&value)
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three analysis roles served by the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "linter")]
    Lint,
    #[serde(rename = "refactor")]
    Refactor,
    #[serde(rename = "testgen")]
    TestGen,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Lint, Capability::Refactor, Capability::TestGen];

    pub fn id(&self) -> &'static str {
        match self {
            Capability::Lint => "linter",
            Capability::Refactor => "refactor",
            Capability::TestGen => "testgen",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Capability::Lint => "Linter Agent",
            Capability::Refactor => "Refactor Agent",
            Capability::TestGen => "Test Generation Agent",
        }
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            Capability::Lint => "microsoft/codebert-base",
            Capability::Refactor => "Salesforce/codet5-small",
            Capability::TestGen => "microsoft/codebert-base-mlm",
        }
    }

    pub fn features(&self) -> &'static [&'static str] {
        match self {
            Capability::Lint => &["bug_detection", "style_analysis", "security_check"],
            Capability::Refactor => &[
                "code_optimization",
                "pattern_improvement",
                "performance_tuning",
            ],
            Capability::TestGen => &["unit_tests", "integration_tests", "edge_cases"],
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Error => 3,
            Severity::Warning => 2,
            Severity::Info => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A single diagnostic produced by a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_position")]
    pub line: u32,
    #[serde(default = "default_position")]
    pub column: u32,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, alias = "rule")]
    pub category: String,
    #[serde(default)]
    pub fixable: bool,
}

fn default_position() -> u32 {
    1
}

impl Issue {
    pub fn new(severity: Severity, line: u32, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            line: line.max(1),
            column: 1,
            suggestion: String::new(),
            category: String::new(),
            fixable: false,
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = column.max(1);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtTier {
    Low,
    Medium,
    High,
}

/// Base code metrics. Every derived score is computed from these three
/// fields on demand; the serialized form recomputes them and deserialization
/// ignores whatever derived values the payload carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "MetricsReport", from = "MetricsReport")]
pub struct MetricSet {
    pub complexity: u32,
    pub maintainability: u8,
    pub lines_of_code: u32,
}

impl MetricSet {
    pub fn new(complexity: u32, maintainability: u8, lines_of_code: u32) -> Self {
        Self {
            complexity,
            maintainability: maintainability.min(10),
            lines_of_code,
        }
    }

    /// Metrics of a blank snippet.
    pub fn empty() -> Self {
        Self::new(0, 10, 0)
    }

    fn complexity_score(&self) -> u32 {
        10 - self.complexity.min(10)
    }

    pub fn quality_score(&self) -> u8 {
        let weighted = self.complexity_score() * 4 + u32::from(self.maintainability) * 6;
        (weighted / 10).min(10) as u8
    }

    pub fn technical_debt(&self) -> DebtTier {
        match self.quality_score() {
            8..=10 => DebtTier::Low,
            5..=7 => DebtTier::Medium,
            _ => DebtTier::High,
        }
    }

    pub fn readability(&self) -> u8 {
        ((u32::from(self.maintainability) * 2 + self.complexity_score()) / 3).min(10) as u8
    }

    pub fn testability(&self) -> u8 {
        (10 - self.complexity.saturating_sub(1).min(10)) as u8
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Wire form of [`MetricSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    #[serde(default)]
    pub complexity: u32,
    #[serde(default = "default_maintainability")]
    pub maintainability: u8,
    #[serde(default)]
    pub lines_of_code: u32,
    #[serde(default)]
    pub code_quality_score: u8,
    #[serde(default = "default_debt")]
    pub technical_debt: DebtTier,
    #[serde(default)]
    pub readability: u8,
    #[serde(default)]
    pub testability: u8,
}

fn default_maintainability() -> u8 {
    10
}

fn default_debt() -> DebtTier {
    DebtTier::Low
}

impl From<MetricSet> for MetricsReport {
    fn from(metrics: MetricSet) -> Self {
        Self {
            complexity: metrics.complexity,
            maintainability: metrics.maintainability,
            lines_of_code: metrics.lines_of_code,
            code_quality_score: metrics.quality_score(),
            technical_debt: metrics.technical_debt(),
            readability: metrics.readability(),
            testability: metrics.testability(),
        }
    }
}

impl From<MetricsReport> for MetricSet {
    fn from(report: MetricsReport) -> Self {
        MetricSet::new(report.complexity, report.maintainability, report.lines_of_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    #[default]
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,
    #[serde(default = "default_position", alias = "start_line")]
    pub start_line: u32,
    #[serde(default = "default_position", alias = "end_line")]
    pub end_line: u32,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default = "default_position")]
    pub complexity: u32,
    #[serde(default)]
    pub kind: FunctionKind,
}

impl FunctionInfo {
    pub fn new(name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            name: name.into(),
            start_line,
            end_line: end_line.max(start_line),
            parameters: Vec::new(),
            complexity: 1,
            kind: FunctionKind::Function,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_kind(mut self, kind: FunctionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = complexity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Performance,
    Readability,
    Maintainability,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Performance => "performance",
            SuggestionKind::Readability => "readability",
            SuggestionKind::Maintainability => "maintainability",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub original_code: String,
    #[serde(rename = "refactoredCode")]
    pub proposed_code: String,
    pub line_start: u32,
    pub line_end: u32,
    pub impact: Impact,
    pub impact_score: u8,
    pub confidence: u8,
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_improvement: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Unit,
    EdgeCase,
    Performance,
    Negative,
    Integration,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Unit => "unit",
            TestKind::EdgeCase => "edge_case",
            TestKind::Performance => "performance",
            TestKind::Negative => "negative",
            TestKind::Integration => "integration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TestKind,
    pub code: String,
    pub expected_result: String,
    pub framework: String,
    pub priority: u8,
    #[serde(default)]
    pub test_data: Option<serde_json::Value>,
}

impl TestCase {
    pub fn is_unit(&self) -> bool {
        self.kind == TestKind::Unit
    }
}

/// Output of the secondary semantic pass, kept apart from rule-set issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub semantic_issues: Vec<String>,
    pub performance_suggestions: Vec<String>,
    pub security_concerns: Vec<String>,
    pub code_smells: Vec<String>,
}

/// Raw output of a lint run before ranking and stamping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisResult {
    pub issues: Vec<Issue>,
    pub metrics: MetricSet,
    pub functions: Vec<FunctionInfo>,
    pub insights: Insights,
    pub degraded: bool,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Formatted analysis as delivered to clients and stored in the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub issues: Vec<Ranked<Issue>>,
    pub metrics: MetricSet,
    pub functions: Vec<FunctionInfo>,
    pub insights: Insights,
    pub fingerprint: String,
    pub language: Language,
    pub degraded: bool,
    pub agent: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

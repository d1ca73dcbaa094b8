//! Per-language lint rule sets and the registry the pipeline resolves them
//! from. Rules are plain heuristics over text; they must be pure functions
//! of their input so repeated runs yield identical output.

pub mod generic;
pub mod java;
pub mod javascript;
pub mod python;

use cognicode_core::{FunctionInfo, FunctionKind, Issue, Language, MetricSet};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use generic::GenericRules;
pub use java::JavaRules;
pub use javascript::{JavaScriptRules, TypeScriptRules};
pub use python::{parse_python, ParseOutcome, PythonModule, PythonRules};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("{rule_set} rule set failed: {reason}")]
    Failed { rule_set: String, reason: String },
}

/// Output of one rule-set pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleOutput {
    pub issues: Vec<Issue>,
    pub metrics: MetricSet,
    pub functions: Vec<FunctionInfo>,
}

pub trait RuleSet: Send + Sync {
    fn name(&self) -> &str;

    /// Analyzes already-normalized, non-blank code.
    fn analyze(&self, code: &str) -> Result<RuleOutput, RuleError>;

    /// Function and class records, used when a client asks for tests
    /// without supplying them.
    fn extract_functions(&self, code: &str) -> Vec<FunctionInfo> {
        self.analyze(code)
            .map(|output| output.functions)
            .unwrap_or_default()
    }
}

/// Language → rule set mapping with a generic fallback.
#[derive(Clone)]
pub struct RuleRegistry {
    rule_sets: HashMap<Language, Arc<dyn RuleSet>>,
    fallback: Arc<dyn RuleSet>,
}

impl RuleRegistry {
    /// Registry with no language-specific rules at all.
    pub fn empty() -> Self {
        Self {
            rule_sets: HashMap::new(),
            fallback: Arc::new(GenericRules),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Language::JavaScript, Arc::new(JavaScriptRules));
        registry.register(Language::TypeScript, Arc::new(TypeScriptRules));
        registry.register(Language::Python, Arc::new(PythonRules));
        registry.register(Language::Java, Arc::new(JavaRules));
        registry
    }

    pub fn register(&mut self, language: Language, rule_set: Arc<dyn RuleSet>) {
        self.rule_sets.insert(language, rule_set);
    }

    pub fn resolve(&self, language: &Language) -> Arc<dyn RuleSet> {
        self.rule_sets
            .get(language)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn is_registered(&self, language: &Language) -> bool {
        self.rule_sets.contains_key(language)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

lazy_static! {
    static ref BRANCH_KEYWORD: Regex = Regex::new(r"\b(if|for|while|switch)\b").unwrap();
}

/// Branching keywords on one line of a C-family language.
pub(crate) fn branch_count(line: &str) -> u32 {
    BRANCH_KEYWORD.find_iter(line).count() as u32
}

pub(crate) fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Calls of `name(` anywhere in `code`, the declaration included.
pub(crate) fn call_count(code: &str, name: &str) -> usize {
    match Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))) {
        Ok(pattern) => pattern.find_iter(code).count(),
        Err(_) => 0,
    }
}

/// Whether a function calls itself between the end of its parameter list
/// and the end of its line range.
pub fn is_recursive(code: &str, function: &FunctionInfo) -> bool {
    if function.kind != FunctionKind::Function {
        return false;
    }
    let lines: Vec<&str> = code.lines().collect();
    let from = function.start_line.saturating_sub(1) as usize;
    let to = (function.end_line as usize).min(lines.len());
    let Some(range) = lines.get(from..to) else {
        return false;
    };
    let body = range.join("\n");
    let after_signature = body.find(')').map_or(body.as_str(), |at| &body[at + 1..]);
    call_count(after_signature, &function.name) > 0
}

/// Complexity of a line range: one plus the branches inside it.
pub(crate) fn range_complexity(lines: &[&str], start: u32, end: u32) -> u32 {
    let from = start.saturating_sub(1) as usize;
    let to = (end as usize).min(lines.len());
    1 + lines
        .get(from..to)
        .unwrap_or(&[])
        .iter()
        .filter(|line| !is_comment_line(line))
        .map(|line| branch_count(line))
        .sum::<u32>()
}

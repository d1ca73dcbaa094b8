//! Secondary semantic pass. Its findings are reported as prose and kept
//! apart from rule-set issues.

use cognicode_core::{FunctionInfo, Insights, Language};
use lazy_static::lazy_static;
use regex::Regex;

use crate::rules::is_recursive;

lazy_static! {
    static ref LOOP_HEADER: Regex = Regex::new(r"^\s*(?:for|while)\b").unwrap();
    static ref LENGTH_IN_LOOP: Regex = Regex::new(r"\bfor\s*\([^;]*;[^;]*\.length\s*;").unwrap();
    static ref STRING_CONCAT_IN_LOOP: Regex = Regex::new(r"\+=\s*['\x22]").unwrap();
    static ref EVAL_CALL: Regex = Regex::new(r"\beval\s*\(").unwrap();
    static ref EXEC_CALL: Regex = Regex::new(r"\b(?:exec|os\.system)\s*\(").unwrap();
    static ref INNER_HTML: Regex = Regex::new(r"\.innerHTML\s*=").unwrap();
    static ref HARDCODED_SECRET: Regex =
        Regex::new(r#"(?i)\b(?:password|passwd|secret|api_?key|token)\s*[:=]\s*["'][^"']+["']"#).unwrap();
    static ref TODO_MARKER: Regex = Regex::new(r"\b(?:TODO|FIXME|XXX)\b").unwrap();
    static ref ASSIGN_IN_CONDITION: Regex = Regex::new(r"\bif\s*\(\s*[\w.]+\s*=\s*[^=]").unwrap();
}

const LONG_FUNCTION_LINES: u32 = 30;
const HIGH_COMPLEXITY: u32 = 5;

pub fn semantic_insights(code: &str, language: &Language, functions: &[FunctionInfo]) -> Insights {
    let lines: Vec<&str> = code.lines().collect();
    let mut insights = Insights::default();

    if ASSIGN_IN_CONDITION.is_match(code) && language.is_javascript_family() {
        insights
            .semantic_issues
            .push("Assignment inside an if condition; did you mean a comparison?".to_string());
    }
    if TODO_MARKER.is_match(code) {
        insights
            .semantic_issues
            .push("Unresolved TODO/FIXME markers left in the code".to_string());
    }

    for function in functions {
        if is_recursive(code, function) {
            insights.performance_suggestions.push(format!(
                "'{}' calls itself; memoization or an iterative rewrite avoids repeated work",
                function.name
            ));
        }
    }
    if has_nested_loops(&lines) {
        insights
            .performance_suggestions
            .push("Nested loops detected; a lookup table may reduce the cost".to_string());
    }
    if LENGTH_IN_LOOP.is_match(code) {
        insights
            .performance_suggestions
            .push("Cache collection length outside the loop condition".to_string());
    }
    if STRING_CONCAT_IN_LOOP.is_match(code) && has_loop(&lines) {
        insights
            .performance_suggestions
            .push("String concatenation in a loop; collect parts and join once".to_string());
    }

    if EVAL_CALL.is_match(code) {
        insights
            .security_concerns
            .push("eval() executes arbitrary code".to_string());
    }
    if EXEC_CALL.is_match(code) {
        insights
            .security_concerns
            .push("Dynamic command or code execution".to_string());
    }
    if INNER_HTML.is_match(code) {
        insights
            .security_concerns
            .push("Assigning to innerHTML can enable cross-site scripting".to_string());
    }
    if HARDCODED_SECRET.is_match(code) {
        insights
            .security_concerns
            .push("Possible hard-coded credential".to_string());
    }

    for function in functions {
        let length = function.end_line.saturating_sub(function.start_line) + 1;
        if length > LONG_FUNCTION_LINES {
            insights.code_smells.push(format!(
                "'{}' spans {} lines; consider splitting it",
                function.name, length
            ));
        }
        if function.complexity > HIGH_COMPLEXITY {
            insights.code_smells.push(format!(
                "'{}' has complexity {}; consider simplifying its branches",
                function.name, function.complexity
            ));
        }
        if function.parameters.len() > 4 {
            insights.code_smells.push(format!(
                "'{}' takes {} parameters; consider a parameter object",
                function.name,
                function.parameters.len()
            ));
        }
    }

    insights
}

fn has_loop(lines: &[&str]) -> bool {
    lines.iter().any(|line| LOOP_HEADER.is_match(line))
}

/// A loop header followed by a deeper-indented loop header before the outer
/// block's indentation level is reached again.
fn has_nested_loops(lines: &[&str]) -> bool {
    let indent = |line: &str| line.len() - line.trim_start().len();
    let mut outer: Vec<usize> = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let level = indent(line);
        while outer.last().is_some_and(|&open| level <= open) {
            outer.pop();
        }
        if LOOP_HEADER.is_match(line) {
            if !outer.is_empty() {
                return true;
            }
            outer.push(level);
        }
    }
    false
}

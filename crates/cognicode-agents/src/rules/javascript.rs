use super::{branch_count, is_comment_line, is_recursive, range_complexity, RuleError, RuleOutput, RuleSet};
use crate::normalize::{brace_block_end, line_count, split_parameters};
use cognicode_core::{FunctionInfo, FunctionKind, Issue, MetricSet, Severity};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FUNCTION_DECL: Regex =
        Regex::new(r"\bfunction\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(([^)]*)\)").unwrap();
    static ref ARROW_DECL: Regex = Regex::new(
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\(([^)]*)\)|([A-Za-z_$][\w$]*))\s*=>"
    )
    .unwrap();
    static ref CLASS_DECL: Regex = Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)").unwrap();
    static ref VAR_DECL: Regex = Regex::new(r"\bvar\s").unwrap();
    static ref CONSOLE_LOG: Regex = Regex::new(r"\bconsole\.log\s*\(").unwrap();
    static ref EXPLICIT_ANY: Regex = Regex::new(r":\s*any\b").unwrap();
}

/// Heuristic rules for JavaScript.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaScriptRules;

/// JavaScript rules plus TypeScript-only checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeScriptRules;

impl RuleSet for JavaScriptRules {
    fn name(&self) -> &str {
        "javascript"
    }

    fn analyze(&self, code: &str) -> Result<RuleOutput, RuleError> {
        Ok(analyze_script(code, false))
    }

    fn extract_functions(&self, code: &str) -> Vec<FunctionInfo> {
        let lines: Vec<&str> = code.lines().collect();
        declarations(&lines)
    }
}

impl RuleSet for TypeScriptRules {
    fn name(&self) -> &str {
        "typescript"
    }

    fn analyze(&self, code: &str) -> Result<RuleOutput, RuleError> {
        Ok(analyze_script(code, true))
    }

    fn extract_functions(&self, code: &str) -> Vec<FunctionInfo> {
        let lines: Vec<&str> = code.lines().collect();
        declarations(&lines)
    }
}

fn analyze_script(code: &str, typed: bool) -> RuleOutput {
    let lines: Vec<&str> = code.lines().collect();
    let mut issues = Vec::new();
    let mut complexity: u32 = 1;

    for (index, line) in lines.iter().enumerate() {
        let line_no = index as u32 + 1;
        if is_comment_line(line) {
            continue;
        }

        if let Some(found) = VAR_DECL.find(line) {
            issues.push(
                Issue::new(Severity::Warning, line_no, "Use 'let' or 'const' instead of 'var'")
                    .with_column(found.start() as u32 + 1)
                    .with_suggestion("Replace 'var' with 'let' or 'const' for block scoping")
                    .with_category("no-var")
                    .fixable(),
            );
        }

        if let Some(column) = loose_equality_column(line) {
            issues.push(
                Issue::new(Severity::Warning, line_no, "Use strict equality (===) instead of ==")
                    .with_column(column)
                    .with_suggestion("Replace '==' with '===' to avoid type coercion")
                    .with_category("eqeqeq")
                    .fixable(),
            );
        }

        if let Some(found) = CONSOLE_LOG.find(line) {
            issues.push(
                Issue::new(Severity::Info, line_no, "Remove console.log statements in production")
                    .with_column(found.start() as u32 + 1)
                    .with_suggestion("Use a logging library or remove debug statements")
                    .with_category("no-console"),
            );
        }

        if typed {
            if let Some(found) = EXPLICIT_ANY.find(line) {
                issues.push(
                    Issue::new(Severity::Warning, line_no, "Avoid the 'any' type")
                        .with_column(found.start() as u32 + 1)
                        .with_suggestion("Declare a specific type or use 'unknown'")
                        .with_category("no-explicit-any"),
                );
            }
        }

        complexity += branch_count(line);
    }

    let functions = declarations(&lines);
    for function in &functions {
        if is_recursive(code, function) {
            issues.push(
                Issue::new(
                    Severity::Warning,
                    function.start_line,
                    format!("Recursive function '{}' may have performance issues", function.name),
                )
                .with_suggestion("Consider memoization or an iterative approach")
                .with_category("recursion"),
            );
            complexity += 5;
        }
    }

    let maintainability = 10usize.saturating_sub(issues.len()).max(1) as u8;

    RuleOutput {
        metrics: MetricSet::new(complexity, maintainability, line_count(code)),
        issues,
        functions,
    }
}

/// Column (1-based) of the first `==` that is neither part of `===` nor of
/// `!=`/`!==`.
fn loose_equality_column(line: &str) -> Option<u32> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'=' && bytes[i + 1] == b'=' {
            let before = if i > 0 { bytes[i - 1] } else { b' ' };
            let after = bytes.get(i + 2).copied().unwrap_or(b' ');
            if before != b'=' && before != b'!' && after != b'=' {
                return Some(i as u32 + 1);
            }
            // skip the whole run of '='
            while i < bytes.len() && bytes[i] == b'=' {
                i += 1;
            }
            continue;
        }
        i += 1;
    }
    None
}

/// Function, arrow-function and class declarations in source order.
fn declarations(lines: &[&str]) -> Vec<FunctionInfo> {
    let mut found = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if is_comment_line(line) {
            continue;
        }
        let start = index as u32 + 1;

        if let Some(caps) = CLASS_DECL.captures(line) {
            let end = brace_block_end(lines, start);
            found.push(
                FunctionInfo::new(&caps[1], start, end)
                    .with_kind(FunctionKind::Class)
                    .with_complexity(range_complexity(lines, start, end)),
            );
            continue;
        }

        let declared = FUNCTION_DECL
            .captures(line)
            .map(|caps| (caps[1].to_string(), caps.get(2).map_or("", |m| m.as_str()).to_string()))
            .or_else(|| {
                ARROW_DECL.captures(line).map(|caps| {
                    let params = caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .map_or("", |m| m.as_str());
                    (caps[1].to_string(), params.to_string())
                })
            });

        if let Some((name, params)) = declared {
            let end = brace_block_end(lines, start);
            found.push(
                FunctionInfo::new(name, start, end)
                    .with_parameters(split_parameters(&params))
                    .with_complexity(range_complexity(lines, start, end)),
            );
        }
    }

    found
}

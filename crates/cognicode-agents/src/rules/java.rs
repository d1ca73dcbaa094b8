use super::{branch_count, is_comment_line, range_complexity, RuleError, RuleOutput, RuleSet};
use crate::normalize::{brace_block_end, line_count};
use cognicode_core::{FunctionInfo, FunctionKind, Issue, MetricSet, Severity};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref METHOD_DECL: Regex = Regex::new(
        r"^\s*(?:public|private|protected|static)\b[^=;(]*?\b([A-Za-z_]\w*)\s*\(([^)]*)\)"
    )
    .unwrap();
    static ref CLASS_DECL: Regex =
        Regex::new(r"\b(?:class|interface|enum|record)\s+([A-Za-z_]\w*)").unwrap();
    static ref SYSTEM_OUT: Regex = Regex::new(r"\bSystem\.(?:out|err)\.print").unwrap();
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JavaRules;

impl RuleSet for JavaRules {
    fn name(&self) -> &str {
        "java"
    }

    fn analyze(&self, code: &str) -> Result<RuleOutput, RuleError> {
        let lines: Vec<&str> = code.lines().collect();
        let mut issues = Vec::new();
        let mut complexity = 1;

        for (index, line) in lines.iter().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            if let Some(found) = SYSTEM_OUT.find(line) {
                issues.push(
                    Issue::new(
                        Severity::Info,
                        index as u32 + 1,
                        "Use a logging framework instead of System.out.println",
                    )
                    .with_column(found.start() as u32 + 1)
                    .with_suggestion("Replace with a logger such as SLF4J")
                    .with_category("no-system-out"),
                );
            }
            complexity += branch_count(line);
        }

        Ok(RuleOutput {
            issues,
            metrics: MetricSet::new(complexity, 10, line_count(code)),
            functions: declarations(&lines),
        })
    }
}

fn declarations(lines: &[&str]) -> Vec<FunctionInfo> {
    let mut found = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if is_comment_line(line) {
            continue;
        }
        let start = index as u32 + 1;

        if let Some(caps) = CLASS_DECL.captures(line) {
            let end = brace_block_end(lines, start);
            found.push(FunctionInfo::new(&caps[1], start, end).with_kind(FunctionKind::Class));
        } else if let Some(caps) = METHOD_DECL.captures(line) {
            let end = brace_block_end(lines, start);
            let parameters = caps
                .get(2)
                .map_or("", |m| m.as_str())
                .split(',')
                .filter_map(|param| param.split_whitespace().last())
                .map(str::to_string)
                .collect();
            found.push(
                FunctionInfo::new(&caps[1], start, end)
                    .with_parameters(parameters)
                    .with_complexity(range_complexity(lines, start, end)),
            );
        }
    }

    found
}

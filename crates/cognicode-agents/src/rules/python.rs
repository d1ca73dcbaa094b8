//! Python rules. A light structural parse runs first; when it fails the
//! rule set reports a single syntax error instead of guessing at structure.

use super::{RuleError, RuleOutput, RuleSet};
use crate::normalize::{line_count, split_parameters};
use cognicode_core::{FunctionInfo, FunctionKind, Issue, MetricSet, Severity};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DEF_DECL: Regex =
        Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(([^)]*)").unwrap();
    static ref CLASS_DECL: Regex = Regex::new(r"^(\s*)class\s+([A-Za-z_]\w*)").unwrap();
    static ref BLOCK_HEADER: Regex = Regex::new(
        r"^(?:async\s+)?(def|class|if|elif|else|for|while|try|except|finally|with)\b"
    )
    .unwrap();
    static ref BRANCH: Regex = Regex::new(r"^(?:async\s+)?(if|elif|for|while)\b").unwrap();
    static ref BARE_EXCEPT: Regex = Regex::new(r"^except\s*:").unwrap();
    static ref NONE_EQUALITY: Regex = Regex::new(r"[!=]=\s*None\b").unwrap();
}

/// Structure recovered from a snippet that parsed cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PythonModule {
    pub definitions: Vec<FunctionInfo>,
    pub branch_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(PythonModule),
    SyntaxIssue { message: String, line: u32 },
}

/// Checks bracket balance and block-header colons, then collects
/// definitions and branch statements.
pub fn parse_python(code: &str) -> ParseOutcome {
    let lines: Vec<&str> = code.lines().collect();
    let mut scanner = Scanner::default();

    for (index, raw) in lines.iter().enumerate() {
        let line_no = index as u32 + 1;
        let starts_logical = scanner.depth() == 0 && !scanner.in_triple_quote();
        let stripped = raw.trim_start();

        if starts_logical && !stripped.is_empty() && !stripped.starts_with('#') {
            if BLOCK_HEADER.is_match(stripped) {
                scanner.header = Some(line_no);
                scanner.header_colon = false;
            }
        }

        if let Err(message) = scanner.scan_line(raw, line_no) {
            return ParseOutcome::SyntaxIssue {
                message,
                line: line_no,
            };
        }

        if scanner.depth() == 0 && !scanner.in_triple_quote() && !scanner.continued {
            if let Some(header) = scanner.header.take() {
                if !scanner.header_colon {
                    return ParseOutcome::SyntaxIssue {
                        message: "expected ':'".to_string(),
                        line: header,
                    };
                }
            }
        }
    }

    if let Some((bracket, line)) = scanner.open.last() {
        return ParseOutcome::SyntaxIssue {
            message: format!("'{}' was never closed", bracket),
            line: *line,
        };
    }
    if let Some(line) = scanner.triple_quote {
        return ParseOutcome::SyntaxIssue {
            message: "unterminated triple-quoted string literal".to_string(),
            line,
        };
    }
    if let Some(header) = scanner.header {
        return ParseOutcome::SyntaxIssue {
            message: "expected ':'".to_string(),
            line: header,
        };
    }

    ParseOutcome::Parsed(PythonModule {
        definitions: definitions(&lines),
        branch_count: lines
            .iter()
            .filter(|line| BRANCH.is_match(line.trim_start()))
            .count() as u32,
    })
}

#[derive(Default)]
struct Scanner {
    open: Vec<(char, u32)>,
    triple_quote: Option<u32>,
    triple_delim: &'static str,
    header: Option<u32>,
    header_colon: bool,
    continued: bool,
}

impl Scanner {
    fn depth(&self) -> usize {
        self.open.len()
    }

    fn in_triple_quote(&self) -> bool {
        self.triple_quote.is_some()
    }

    fn scan_line(&mut self, line: &str, line_no: u32) -> Result<(), String> {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        self.continued = false;

        while i < chars.len() {
            if self.triple_quote.is_some() {
                if starts_with_at(&chars, i, self.triple_delim) {
                    self.triple_quote = None;
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }

            match chars[i] {
                '#' => break,
                '"' | '\'' => {
                    let quote = chars[i];
                    let delim = if quote == '"' { "\"\"\"" } else { "'''" };
                    if starts_with_at(&chars, i, delim) {
                        self.triple_quote = Some(line_no);
                        self.triple_delim = delim;
                        i += 3;
                        continue;
                    }
                    i += 1;
                    while i < chars.len() && chars[i] != quote {
                        if chars[i] == '\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err("unterminated string literal".to_string());
                    }
                }
                '(' | '[' | '{' => self.open.push((chars[i], line_no)),
                ')' | ']' | '}' => {
                    let expected = match chars[i] {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match self.open.pop() {
                        Some((bracket, _)) if bracket == expected => {}
                        _ => return Err(format!("unmatched '{}'", chars[i])),
                    }
                }
                ':' if self.open.is_empty() => self.header_colon = true,
                '\\' if i + 1 == chars.len() => self.continued = true,
                _ => {}
            }
            i += 1;
        }
        Ok(())
    }
}

fn starts_with_at(chars: &[char], at: usize, pattern: &str) -> bool {
    pattern
        .chars()
        .enumerate()
        .all(|(offset, expected)| chars.get(at + offset) == Some(&expected))
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Last line (1-based) of the indented block introduced at `start`.
fn block_end(lines: &[&str], start: u32, indent: usize) -> u32 {
    let mut end = start;
    for (index, line) in lines.iter().enumerate().skip(start as usize) {
        let stripped = line.trim_start();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        if indentation(line) <= indent {
            break;
        }
        end = index as u32 + 1;
    }
    end
}

fn definitions(lines: &[&str]) -> Vec<FunctionInfo> {
    let mut found = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let start = index as u32 + 1;
        let (indent, info) = if let Some(caps) = DEF_DECL.captures(line) {
            let indent = caps[1].len();
            let params = split_parameters(caps.get(3).map_or("", |m| m.as_str()));
            (indent, FunctionInfo::new(&caps[2], start, start).with_parameters(params))
        } else if let Some(caps) = CLASS_DECL.captures(line) {
            let indent = caps[1].len();
            (
                indent,
                FunctionInfo::new(&caps[2], start, start).with_kind(FunctionKind::Class),
            )
        } else {
            continue;
        };

        let end = block_end(lines, start, indent);
        let branches = lines[index..end as usize]
            .iter()
            .filter(|l| BRANCH.is_match(l.trim_start()))
            .count() as u32;

        found.push(FunctionInfo {
            end_line: end,
            complexity: 1 + branches,
            ..info
        });
    }

    found
}

/// Python rule set backed by [`parse_python`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonRules;

impl RuleSet for PythonRules {
    fn name(&self) -> &str {
        "python"
    }

    fn analyze(&self, code: &str) -> Result<RuleOutput, RuleError> {
        let loc = line_count(code);

        let module = match parse_python(code) {
            ParseOutcome::Parsed(module) => module,
            ParseOutcome::SyntaxIssue { message, line } => {
                return Ok(RuleOutput {
                    issues: vec![Issue::new(
                        Severity::Error,
                        line,
                        format!("Syntax error: {}", message),
                    )
                    .with_suggestion("Fix syntax error to enable full analysis")
                    .with_category("syntax")],
                    metrics: MetricSet::new(1, 10, loc),
                    functions: Vec::new(),
                });
            }
        };

        let mut issues = Vec::new();
        for (index, line) in code.lines().enumerate() {
            let line_no = index as u32 + 1;
            let stripped = line.trim_start();
            let column = (indentation(line) + 1) as u32;

            if BARE_EXCEPT.is_match(stripped) {
                issues.push(
                    Issue::new(Severity::Warning, line_no, "Avoid bare 'except:' clauses")
                        .with_column(column)
                        .with_suggestion("Catch a specific exception type")
                        .with_category("bare-except"),
                );
            }
            if let Some(found) = NONE_EQUALITY.find(line) {
                issues.push(
                    Issue::new(Severity::Warning, line_no, "Compare to None with 'is' or 'is not'")
                        .with_column(found.start() as u32 + 1)
                        .with_suggestion("Replace '== None' with 'is None'")
                        .with_category("none-comparison")
                        .fixable(),
                );
            }
        }

        Ok(RuleOutput {
            issues,
            metrics: MetricSet::new(1 + module.branch_count, 10, loc),
            functions: module.definitions,
        })
    }

    fn extract_functions(&self, code: &str) -> Vec<FunctionInfo> {
        match parse_python(code) {
            ParseOutcome::Parsed(module) => module.definitions,
            ParseOutcome::SyntaxIssue { .. } => Vec::new(),
        }
    }
}

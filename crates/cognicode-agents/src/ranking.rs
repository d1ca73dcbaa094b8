//! Deterministic ordering and identification of pipeline output.
//!
//! Every sort here is stable, so items with equal keys keep the order in
//! which the pipeline produced them.

use cognicode_core::{Identify, Issue, Ranked, Suggestion, TestCase};
use std::cmp::Reverse;
use std::collections::HashSet;

/// Severity (error first), then line descending.
pub fn rank_issues(issues: &mut [Issue]) {
    issues.sort_by_key(|issue| (Reverse(issue.severity.rank()), Reverse(issue.line)));
}

/// Impact score, then confidence, both descending.
pub fn rank_suggestions(suggestions: &mut [Suggestion]) {
    suggestions.sort_by_key(|s| (Reverse(s.impact_score), Reverse(s.confidence)));
}

/// Priority descending; unit tests ahead of other kinds on ties.
pub fn rank_tests(tests: &mut [TestCase]) {
    tests.sort_by_key(|t| (Reverse(t.priority), Reverse(t.is_unit())));
}

/// Wraps items with their ids, dropping later duplicates of an identity.
pub fn identify<T: Identify>(items: Vec<T>) -> Vec<Ranked<T>> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(Ranked::new)
        .filter(|ranked| seen.insert(ranked.id.clone()))
        .collect()
}

pub fn format_issues(mut issues: Vec<Issue>) -> Vec<Ranked<Issue>> {
    rank_issues(&mut issues);
    identify(issues)
}

pub fn format_suggestions(mut suggestions: Vec<Suggestion>) -> Vec<Ranked<Suggestion>> {
    rank_suggestions(&mut suggestions);
    identify(suggestions)
}

pub fn format_tests(mut tests: Vec<TestCase>) -> Vec<Ranked<TestCase>> {
    rank_tests(&mut tests);
    identify(tests)
}

use super::{RuleError, RuleOutput, RuleSet};
use crate::normalize::line_count;
use cognicode_core::{Issue, MetricSet, Severity};

pub const MAX_LINE_LENGTH: usize = 120;

/// Language-agnostic fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericRules;

impl RuleSet for GenericRules {
    fn name(&self) -> &str {
        "generic"
    }

    fn analyze(&self, code: &str) -> Result<RuleOutput, RuleError> {
        let issues = code
            .lines()
            .enumerate()
            .filter(|(_, line)| line.chars().count() > MAX_LINE_LENGTH)
            .map(|(index, _)| {
                Issue::new(Severity::Info, index as u32 + 1, "Line too long")
                    .with_column(MAX_LINE_LENGTH as u32 + 1)
                    .with_suggestion(format!(
                        "Break long lines for better readability (max {} characters)",
                        MAX_LINE_LENGTH
                    ))
                    .with_category("max-line-length")
            })
            .collect();

        Ok(RuleOutput {
            issues,
            metrics: MetricSet::new(1, 8, line_count(code)),
            functions: Vec::new(),
        })
    }
}

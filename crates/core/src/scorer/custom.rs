use crate::detector::{Context, Detector, DetectorError};
use crate::finding::{CheckResult, CheckType, SeverityScores};
use crate::input::{extract_text, Input};
use crate::pattern::{RuleTable, ScanMode};

pub const CUSTOM_RULES_DETECTOR: &str = "custom-rules";

const SCORES: SeverityScores = SeverityScores {
    low: 10,
    medium: 25,
    high: 45,
    critical: 70,
};

/// Evaluates configured custom rules; one violation per matching rule.
pub struct CustomRulesDetector {
    table: RuleTable,
}

impl CustomRulesDetector {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }
}

impl Detector for CustomRulesDetector {
    fn name(&self) -> &str {
        CUSTOM_RULES_DETECTOR
    }

    fn description(&self) -> &str {
        "Evaluates user-configured pattern rules"
    }

    fn check_type(&self) -> CheckType {
        CheckType::Custom
    }

    fn detect(&self, input: &Input, _context: Option<&Context>) -> Result<CheckResult, DetectorError> {
        let text = extract_text(input);
        let violations = self.table.violations(&text, ScanMode::FirstMatch);
        let score = SCORES.score(&violations);
        Ok(CheckResult::new(
            CheckType::Custom,
            violations.is_empty(),
            score,
            violations,
        )
        .with_metadata("rules", self.table.len()))
    }
}

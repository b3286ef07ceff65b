use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::finding::Violation;

/// Risk tier derived from the overall score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::None,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// `<=10 None, <=30 Low, <=60 Medium, <=85 High, else Critical`.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=10 => RiskLevel::None,
            11..=30 => RiskLevel::Low,
            31..=60 => RiskLevel::Medium,
            61..=85 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    /// Inclusive score band covered by this tier.
    pub fn band(&self) -> (u8, u8) {
        match self {
            RiskLevel::None => (0, 10),
            RiskLevel::Low => (11, 30),
            RiskLevel::Medium => (31, 60),
            RiskLevel::High => (61, 85),
            RiskLevel::Critical => (86, 100),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Aggregate outcome of one `Scorer::score` call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub overall_score: u8,
    /// Detector name -> score. Failed detectors are recorded as 0.
    pub detector_scores: BTreeMap<String, u8>,
    pub aggregated_violations: Vec<Violation>,
    pub passed: bool,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Names of detectors that errored or panicked during this call.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_detectors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            (0, RiskLevel::None),
            (10, RiskLevel::None),
            (11, RiskLevel::Low),
            (30, RiskLevel::Low),
            (31, RiskLevel::Medium),
            (60, RiskLevel::Medium),
            (61, RiskLevel::High),
            (85, RiskLevel::High),
            (86, RiskLevel::Critical),
            (100, RiskLevel::Critical),
        ];
        for (score, expected) in cases {
            assert_eq!(RiskLevel::from_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_bands_agree_with_classification() {
        for level in RiskLevel::ALL {
            let (lo, hi) = level.band();
            assert_eq!(RiskLevel::from_score(lo), level);
            assert_eq!(RiskLevel::from_score(hi), level);
        }
    }
}

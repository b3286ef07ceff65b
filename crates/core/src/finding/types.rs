use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity levels ordered from least to most severe.
/// Derived Ord relies on variant order: Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Closed set of risk signals a detector can raise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    MockUsage,
    StubUsage,
    SpyUsage,
    FakeUsage,
    SqlInjection,
    Xss,
    PathTraversal,
    CommandInjection,
    UnauthorizedAccess,
    InvalidFormat,
    SuspiciousPattern,
    RateLimitExceeded,
    UnusualBehavior,
    StatisticalAnomaly,
    PatternDeviation,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 15] = [
        ViolationKind::MockUsage,
        ViolationKind::StubUsage,
        ViolationKind::SpyUsage,
        ViolationKind::FakeUsage,
        ViolationKind::SqlInjection,
        ViolationKind::Xss,
        ViolationKind::PathTraversal,
        ViolationKind::CommandInjection,
        ViolationKind::UnauthorizedAccess,
        ViolationKind::InvalidFormat,
        ViolationKind::SuspiciousPattern,
        ViolationKind::RateLimitExceeded,
        ViolationKind::UnusualBehavior,
        ViolationKind::StatisticalAnomaly,
        ViolationKind::PatternDeviation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MockUsage => "mock-usage",
            ViolationKind::StubUsage => "stub-usage",
            ViolationKind::SpyUsage => "spy-usage",
            ViolationKind::FakeUsage => "fake-usage",
            ViolationKind::SqlInjection => "sql-injection",
            ViolationKind::Xss => "xss",
            ViolationKind::PathTraversal => "path-traversal",
            ViolationKind::CommandInjection => "command-injection",
            ViolationKind::UnauthorizedAccess => "unauthorized-access",
            ViolationKind::InvalidFormat => "invalid-format",
            ViolationKind::SuspiciousPattern => "suspicious-pattern",
            ViolationKind::RateLimitExceeded => "rate-limit-exceeded",
            ViolationKind::UnusualBehavior => "unusual-behavior",
            ViolationKind::StatisticalAnomaly => "statistical-anomaly",
            ViolationKind::PatternDeviation => "pattern-deviation",
        }
    }

    /// Injection-class kinds share remediation guidance.
    pub fn is_injection(&self) -> bool {
        matches!(
            self,
            ViolationKind::SqlInjection
                | ViolationKind::Xss
                | ViolationKind::PathTraversal
                | ViolationKind::CommandInjection
        )
    }

    /// Test-double kinds (mock/stub/spy/fake).
    pub fn is_test_double(&self) -> bool {
        matches!(
            self,
            ViolationKind::MockUsage
                | ViolationKind::StubUsage
                | ViolationKind::SpyUsage
                | ViolationKind::FakeUsage
        )
    }
}

impl FromStr for ViolationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViolationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown violation kind: {s}"))
    }
}

/// Category of check a detector performs; drives score weighting and enablement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CheckType {
    InputValidation,
    Security,
    MockDetection,
    Anomaly,
    Custom,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::InputValidation => "input-validation",
            CheckType::Security => "security",
            CheckType::MockDetection => "mock-detection",
            CheckType::Anomaly => "anomaly",
            CheckType::Custom => "custom",
        }
    }

    /// Weight applied when pooling detector scores into the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            CheckType::Security => 1.5,
            CheckType::MockDetection => 1.2,
            CheckType::Anomaly => 1.0,
            CheckType::InputValidation => 0.8,
            CheckType::Custom => 1.0,
        }
    }
}

/// A single flagged issue. Detectors never mutate a violation after emitting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Value>,
}

impl Violation {
    pub fn new(kind: ViolationKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            location: None,
            evidence: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<Value>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Per-detector contribution of each severity to its 0..=100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityScores {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl SeverityScores {
    pub fn contribution(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    /// Sum of contributions, capped at 100.
    pub fn score(&self, violations: &[Violation]) -> u8 {
        let total: u32 = violations
            .iter()
            .map(|v| self.contribution(v.severity))
            .fold(0u32, |acc, c| acc.saturating_add(c));
        total.min(100) as u8
    }
}

/// Outcome of one detector invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub passed: bool,
    pub score: u8,
    pub violations: Vec<Violation>,
    pub timestamp: DateTime<Utc>,
    pub check_type: CheckType,
    pub metadata: BTreeMap<String, Value>,
}

impl CheckResult {
    pub fn new(check_type: CheckType, passed: bool, score: u8, violations: Vec<Violation>) -> Self {
        Self {
            passed,
            score: score.min(100),
            violations,
            timestamp: Utc::now(),
            check_type,
            metadata: BTreeMap::new(),
        }
    }

    /// A passing result with no violations.
    pub fn clean(check_type: CheckType) -> Self {
        Self::new(check_type, true, 0, Vec::new())
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn has_severity_at_least(&self, min: Severity) -> bool {
        self.violations.iter().any(|v| v.severity >= min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: SeverityScores = SeverityScores {
        low: 10,
        medium: 25,
        high: 45,
        critical: 70,
    };

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_score_is_capped() {
        let violations = vec![
            Violation::new(ViolationKind::InvalidFormat, Severity::Critical, "a"),
            Violation::new(ViolationKind::InvalidFormat, Severity::High, "b"),
        ];
        assert_eq!(TABLE.score(&violations), 100);
        assert_eq!(TABLE.score(&violations[1..]), 45);
        assert_eq!(TABLE.score(&[]), 0);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ViolationKind::ALL {
            assert_eq!(kind.as_str().parse::<ViolationKind>().unwrap(), kind);
        }
        assert!("not-a-kind".parse::<ViolationKind>().is_err());
    }

    #[test]
    fn test_violation_serializes_kind_as_type() {
        let v = Violation::new(ViolationKind::SqlInjection, Severity::Critical, "tautology")
            .at("line 1");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], "sql-injection");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["location"], "line 1");
        assert!(json.get("evidence").is_none());
    }
}

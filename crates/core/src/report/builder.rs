use std::collections::BTreeMap;

use chrono::Utc;

use super::types::*;
use crate::finding::{Severity, Violation, ViolationKind};
use crate::scorer::{RiskLevel, ScoreResult};

const TOP_RISK_LIMIT: usize = 5;

/// Rank of each kind when picking top risks; lower is more urgent.
pub fn kind_priority(kind: ViolationKind) -> u8 {
    match kind {
        ViolationKind::CommandInjection => 1,
        ViolationKind::SqlInjection => 2,
        ViolationKind::PathTraversal => 3,
        ViolationKind::Xss => 4,
        ViolationKind::UnauthorizedAccess => 5,
        ViolationKind::MockUsage => 6,
        ViolationKind::RateLimitExceeded => 7,
        ViolationKind::StubUsage => 8,
        ViolationKind::SpyUsage => 9,
        ViolationKind::UnusualBehavior => 10,
        ViolationKind::StatisticalAnomaly => 11,
        ViolationKind::SuspiciousPattern => 12,
        ViolationKind::InvalidFormat => 13,
        ViolationKind::PatternDeviation => 14,
        ViolationKind::FakeUsage => 15,
    }
}

pub fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "#dc3545",
        Severity::High => "#fd7e14",
        Severity::Medium => "#ffc107",
        Severity::Low => "#17a2b8",
    }
}

pub fn risk_color(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::None => "#28a745",
        RiskLevel::Low => "#8bc34a",
        RiskLevel::Medium => "#ffc107",
        RiskLevel::High => "#fd7e14",
        RiskLevel::Critical => "#dc3545",
    }
}

impl Report {
    pub fn from_score(result: &ScoreResult) -> Self {
        let violations = &result.aggregated_violations;
        Self {
            generated_at: Utc::now(),
            summary: summary(result),
            details: ReportDetails {
                violations: violations.clone(),
                violations_by_type: group_by(violations, |v| v.kind.as_str()),
                violations_by_severity: group_by(violations, |v| v.severity.as_str()),
                detector_scores: result
                    .detector_scores
                    .iter()
                    .map(|(name, score)| DetectorScoreRow {
                        detector: name.clone(),
                        score: *score,
                        risk_level: RiskLevel::from_score(*score),
                    })
                    .collect(),
                timeline: timeline(result),
                recommendations: result.recommendations.clone(),
            },
            visualizations: visualizations(result),
        }
    }
}

fn summary(result: &ScoreResult) -> ReportSummary {
    let violations = &result.aggregated_violations;
    ReportSummary {
        overall_score: result.overall_score,
        risk_level: result.risk_level,
        passed: result.passed,
        total_violations: violations.len(),
        violations_by_severity: SeverityCounts::from_violations(violations),
        top_risks: top_risks(violations),
    }
}

fn top_risks(violations: &[Violation]) -> Vec<TopRisk> {
    let mut ranked: Vec<&Violation> = violations.iter().collect();
    ranked.sort_by(|a, b| {
        kind_priority(a.kind)
            .cmp(&kind_priority(b.kind))
            .then(b.severity.cmp(&a.severity))
    });
    ranked
        .into_iter()
        .take(TOP_RISK_LIMIT)
        .map(|v| TopRisk {
            kind: v.kind,
            severity: v.severity,
            message: v.message.clone(),
        })
        .collect()
}

fn group_by(
    violations: &[Violation],
    key: impl Fn(&Violation) -> &'static str,
) -> BTreeMap<String, Vec<Violation>> {
    let mut groups: BTreeMap<String, Vec<Violation>> = BTreeMap::new();
    for v in violations {
        groups.entry(key(v).to_string()).or_default().push(v.clone());
    }
    groups
}

fn timeline(result: &ScoreResult) -> Vec<TimelineEvent> {
    let mut events = vec![TimelineEvent {
        timestamp: result.timestamp,
        event: TimelineEventKind::Start,
        description: "Risk assessment started".to_string(),
    }];
    events.extend(
        result
            .aggregated_violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .map(|v| TimelineEvent {
                timestamp: result.timestamp,
                event: TimelineEventKind::Critical,
                description: format!("{}: {}", v.kind, v.message),
            }),
    );
    events.push(TimelineEvent {
        timestamp: result.timestamp,
        event: TimelineEventKind::Complete,
        description: format!(
            "Risk assessment completed with score {} ({})",
            result.overall_score, result.risk_level
        ),
    });
    events
}

fn visualizations(result: &ScoreResult) -> Visualizations {
    let counts = SeverityCounts::from_violations(&result.aggregated_violations);
    Visualizations {
        detector_scores: BarChart {
            title: "Detector Scores".to_string(),
            labels: result.detector_scores.keys().cloned().collect(),
            values: result.detector_scores.values().copied().collect(),
        },
        severity_distribution: PieChart {
            title: "Violations by Severity".to_string(),
            segments: Severity::ALL
                .iter()
                .rev()
                .map(|s| PieSegment {
                    label: s.to_string(),
                    value: counts.get(*s),
                    color: severity_color(*s).to_string(),
                })
                .collect(),
        },
        overall_gauge: Gauge {
            title: "Overall Risk Score".to_string(),
            value: result.overall_score,
            min: 0,
            max: 100,
            zones: RiskLevel::ALL
                .iter()
                .map(|level| {
                    let (from, to) = level.band();
                    GaugeZone {
                        from,
                        to,
                        color: risk_color(*level).to_string(),
                        label: level.to_string(),
                    }
                })
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(violations: Vec<Violation>, score: u8) -> ScoreResult {
        let mut detector_scores = BTreeMap::new();
        detector_scores.insert("security-detector".to_string(), score);
        detector_scores.insert("anomaly-detector".to_string(), 0);
        ScoreResult {
            overall_score: score,
            detector_scores,
            aggregated_violations: violations,
            passed: false,
            risk_level: RiskLevel::from_score(score),
            recommendations: vec!["Block this request immediately".into()],
            timestamp: Utc::now(),
            failed_detectors: vec![],
        }
    }

    fn v(kind: ViolationKind, severity: Severity) -> Violation {
        Violation::new(kind, severity, kind.as_str())
    }

    #[test]
    fn test_top_risks_follow_kind_priority() {
        let result = result_with(
            vec![
                v(ViolationKind::FakeUsage, Severity::Low),
                v(ViolationKind::Xss, Severity::High),
                v(ViolationKind::MockUsage, Severity::High),
                v(ViolationKind::CommandInjection, Severity::Critical),
                v(ViolationKind::SqlInjection, Severity::Critical),
                v(ViolationKind::PathTraversal, Severity::High),
            ],
            90,
        );
        let report = Report::from_score(&result);
        let kinds: Vec<_> = report.summary.top_risks.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::CommandInjection,
                ViolationKind::SqlInjection,
                ViolationKind::PathTraversal,
                ViolationKind::Xss,
                ViolationKind::MockUsage,
            ]
        );
    }

    #[test]
    fn test_timeline_brackets_critical_events() {
        let result = result_with(
            vec![
                v(ViolationKind::SqlInjection, Severity::Critical),
                v(ViolationKind::Xss, Severity::High),
            ],
            90,
        );
        let report = Report::from_score(&result);
        let kinds: Vec<_> = report.details.timeline.iter().map(|e| e.event).collect();
        assert_eq!(
            kinds,
            vec![
                TimelineEventKind::Start,
                TimelineEventKind::Critical,
                TimelineEventKind::Complete
            ]
        );
    }

    #[test]
    fn test_groupings_and_counts() {
        let result = result_with(
            vec![
                v(ViolationKind::Xss, Severity::High),
                v(ViolationKind::Xss, Severity::Medium),
                v(ViolationKind::SqlInjection, Severity::Critical),
            ],
            70,
        );
        let report = Report::from_score(&result);
        assert_eq!(report.summary.total_violations, 3);
        assert_eq!(report.summary.violations_by_severity.high, 1);
        assert_eq!(report.details.violations_by_type["xss"].len(), 2);
        assert_eq!(report.details.violations_by_severity["critical"].len(), 1);
    }

    #[test]
    fn test_visualizations_mirror_scores() {
        let report = Report::from_score(&result_with(vec![], 42));
        let bar = &report.visualizations.detector_scores;
        assert_eq!(bar.labels, vec!["anomaly-detector", "security-detector"]);
        assert_eq!(bar.values, vec![0, 42]);
        let gauge = &report.visualizations.overall_gauge;
        assert_eq!(gauge.value, 42);
        assert_eq!(gauge.zones.len(), 5);
        assert_eq!(gauge.zones[4].to, 100);
        assert_eq!(report.visualizations.severity_distribution.segments[0].label, "CRITICAL");
    }
}

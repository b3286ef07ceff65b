use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::finding::{Severity, Violation, ViolationKind};
use crate::scorer::RiskLevel;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn from_violations(violations: &[Violation]) -> Self {
        let count = |s: Severity| violations.iter().filter(|v| v.severity == s).count();
        Self {
            critical: count(Severity::Critical),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRisk {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    pub passed: bool,
    pub total_violations: usize,
    pub violations_by_severity: SeverityCounts,
    pub top_risks: Vec<TopRisk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectorScoreRow {
    pub detector: String,
    pub score: u8,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineEventKind {
    Start,
    Critical,
    Complete,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    pub event: TimelineEventKind,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDetails {
    /// Violations in aggregation order.
    pub violations: Vec<Violation>,
    pub violations_by_type: BTreeMap<String, Vec<Violation>>,
    pub violations_by_severity: BTreeMap<String, Vec<Violation>>,
    pub detector_scores: Vec<DetectorScoreRow>,
    pub timeline: Vec<TimelineEvent>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieSegment {
    pub label: String,
    pub value: usize,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieChart {
    pub title: String,
    pub segments: Vec<PieSegment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GaugeZone {
    pub from: u8,
    pub to: u8,
    pub color: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Gauge {
    pub title: String,
    pub value: u8,
    pub min: u8,
    pub max: u8,
    pub zones: Vec<GaugeZone>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Visualizations {
    pub detector_scores: BarChart,
    pub severity_distribution: PieChart,
    pub overall_gauge: Gauge,
}

/// Presentation model of one score result.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub details: ReportDetails,
    pub visualizations: Visualizations,
}

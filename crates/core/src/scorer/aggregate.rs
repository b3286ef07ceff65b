//! Pure aggregation policy: weighting, merging, tiering and advice.

use std::collections::HashMap;

use serde_json::Value;

use super::types::RiskLevel;
use crate::finding::{CheckType, Severity, Violation, ViolationKind};

/// Multiplier applied when any violation is critical.
pub const CRITICAL_BOOST: f64 = 1.5;

/// Weighted mean of detector scores, before any boost. 0 when nothing ran.
pub fn weighted_average(scores: &[(CheckType, u8)]) -> f64 {
    let total_weight: f64 = scores.iter().map(|(t, _)| t.weight()).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = scores.iter().map(|(t, s)| t.weight() * f64::from(*s)).sum();
    weighted / total_weight
}

/// Final 0..=100 score: weighted average, boosted on critical findings, rounded.
pub fn overall_score(scores: &[(CheckType, u8)], violations: &[Violation]) -> u8 {
    let mut score = weighted_average(scores);
    if violations.iter().any(|v| v.severity == Severity::Critical) {
        score *= CRITICAL_BOOST;
    }
    score.clamp(0.0, 100.0).round() as u8
}

/// Collapse violations sharing `(kind, severity)` into one entry each.
///
/// Group order follows first appearance. A merged entry keeps the first
/// member's message and location, appends the occurrence count, and gathers
/// every member's evidence into one flat list.
pub fn merge_violations(violations: Vec<Violation>) -> Vec<Violation> {
    let mut index: HashMap<(ViolationKind, Severity), usize> = HashMap::new();
    let mut groups: Vec<Vec<Violation>> = Vec::new();
    for v in violations {
        match index.get(&(v.kind, v.severity)) {
            Some(&i) => groups[i].push(v),
            None => {
                index.insert((v.kind, v.severity), groups.len());
                groups.push(vec![v]);
            }
        }
    }
    groups.into_iter().filter_map(merge_group).collect()
}

fn merge_group(mut group: Vec<Violation>) -> Option<Violation> {
    if group.len() <= 1 {
        return group.pop();
    }
    let count = group.len();
    let mut evidence = Vec::new();
    for member in &group {
        match &member.evidence {
            Some(Value::Array(items)) => evidence.extend(items.iter().cloned()),
            Some(other) => evidence.push(other.clone()),
            None => {}
        }
    }
    let first = &group[0];
    Some(Violation {
        kind: first.kind,
        severity: first.severity,
        message: format!("{} ({} occurrences)", first.message, count),
        location: first.location.clone(),
        evidence: (!evidence.is_empty()).then_some(Value::Array(evidence)),
    })
}

/// Tier guidance followed by kind-specific guidance, without duplicates.
pub fn recommendations(level: RiskLevel, violations: &[Violation]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut add = |text: &str| {
        if !out.iter().any(|r| r == text) {
            out.push(text.to_string());
        }
    };

    match level {
        RiskLevel::Critical => {
            add("Block this request immediately");
            add("Start incident response and review related activity from this source");
        }
        RiskLevel::High => {
            add("Hold for manual review before processing");
            add("Require additional verification from the requester");
        }
        RiskLevel::Medium => {
            add("Apply rate limiting to this source");
            add("Require additional authentication for sensitive operations");
        }
        RiskLevel::Low => add("Record the request in the audit log"),
        RiskLevel::None => {}
    }

    for v in violations {
        if v.kind.is_injection() {
            add("Sanitize and validate all input; use parameterized queries and output encoding");
        } else if v.kind.is_test_double() {
            add("Audit the deployment pipeline so test doubles never reach production code");
        } else if v.kind == ViolationKind::RateLimitExceeded {
            add("Apply exponential backoff or a temporary ban to the client");
        } else if v.kind == ViolationKind::UnusualBehavior {
            add("Compare this activity against the user's behavioral baseline");
        }
    }
    out
}

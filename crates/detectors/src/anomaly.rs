use std::sync::Arc;

use once_cell::sync::Lazy;
use riskguard::detector::{Context, Detector, DetectorError};
use riskguard::finding::*;
use riskguard::history::{mean, std_dev, HistoryStore, InMemoryHistory, DEFAULT_HISTORY_CAPACITY};
use riskguard::input::{extract_text, has_cycle, measure_depth, numeric_leaves, property_count, Input};
use riskguard::pattern::{PatternRule, RuleTable, ScanMode};
use serde_json::json;
use tracing::trace;

pub const MAX_NESTING_DEPTH: usize = 10;
pub const MAX_PROPERTY_COUNT: usize = 1_000;
pub const OUTLIER_Z_THRESHOLD: f64 = 3.0;
pub const BEHAVIOR_Z_THRESHOLD: f64 = 2.5;
/// Baseline samples required before behavioral checks apply.
pub const MIN_BEHAVIOR_SAMPLES: usize = 10;
const MIN_OUTLIER_SAMPLES: usize = 5;
const MIN_REPEAT_LENGTH: usize = 4;
const MIN_RUN_LENGTH: usize = 11;
const STD_DEV_FLOOR: f64 = 1.0;

const SCORES: SeverityScores = SeverityScores {
    low: 20,
    medium: 40,
    high: 60,
    critical: 90,
};

const PATTERNS: &[PatternRule] = &[
    PatternRule {
        name: "long-hex",
        pattern: r"[0-9a-fA-F]{32,}",
        kind: ViolationKind::SuspiciousPattern,
        severity: Severity::Low,
        message: "Long hexadecimal string",
    },
    PatternRule {
        name: "base64-data-uri",
        pattern: r"data:[\w/+.-]*;base64,",
        kind: ViolationKind::SuspiciousPattern,
        severity: Severity::Low,
        message: "Embedded base64 data URI",
    },
];

static RULES: Lazy<RuleTable> = Lazy::new(|| RuleTable::from_static(PATTERNS));

/// Structural, statistical, textual and behavioral anomaly checks.
///
/// Behavioral checks compare the current request size against a per-user
/// baseline kept in the injected [`HistoryStore`]. Reuse one instance for
/// a monitoring session; a fresh instance has no baseline.
pub struct AnomalyDetector {
    history: Arc<dyn HistoryStore>,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::with_history(InMemoryHistory::shared(DEFAULT_HISTORY_CAPACITY))
    }

    pub fn with_history(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    fn structural(&self, input: &Input, out: &mut Vec<Violation>) {
        if measure_depth(input, MAX_NESTING_DEPTH).exceeds(MAX_NESTING_DEPTH) {
            out.push(
                Violation::new(
                    ViolationKind::PatternDeviation,
                    Severity::Medium,
                    format!("Deep nesting: more than {MAX_NESTING_DEPTH} levels"),
                )
                .at("$"),
            );
        }

        let properties = property_count(input);
        if properties > MAX_PROPERTY_COUNT {
            out.push(
                Violation::new(
                    ViolationKind::PatternDeviation,
                    Severity::Medium,
                    format!("Excessive property count: {properties} (limit {MAX_PROPERTY_COUNT})"),
                )
                .with_evidence(properties),
            );
        }

        if has_cycle(input) {
            out.push(
                Violation::new(
                    ViolationKind::SuspiciousPattern,
                    Severity::High,
                    "Circular reference detected",
                )
                .at("$"),
            );
        }
    }

    fn statistical(&self, input: &Input, out: &mut Vec<Violation>) {
        let values = numeric_leaves(input);
        out.extend(outliers(&values));
        if let Some(period) = repeating_period(&values) {
            out.push(
                Violation::new(
                    ViolationKind::PatternDeviation,
                    Severity::Low,
                    format!("Repeating numeric sequence with period {period}"),
                )
                .with_evidence(json!(values[..period].to_vec())),
            );
        }
    }

    fn textual(&self, input: &Input, out: &mut Vec<Violation>) {
        let text = extract_text(input);
        if let Some((c, len)) = longest_run(&text).filter(|(_, len)| *len >= MIN_RUN_LENGTH) {
            out.push(
                Violation::new(
                    ViolationKind::SuspiciousPattern,
                    Severity::Low,
                    format!("Run of {len} repeated '{c}' characters"),
                )
                .with_evidence(len),
            );
        }
        out.extend(RULES.violations(&text, ScanMode::FirstMatch));
    }

    fn behavioral(&self, input: &Input, context: Option<&Context>, out: &mut Vec<Violation>) {
        let Some(user_id) = context.and_then(|c| c.user_id.as_deref()) else {
            return;
        };
        let Some(size) = input.serialized_len() else {
            return;
        };
        let size = size as f64;
        let key = format!("user_{user_id}_request_size");
        let baseline = self.history.observe(&key, size);
        if baseline.len() < MIN_BEHAVIOR_SAMPLES {
            trace!(user = user_id, samples = baseline.len(), "baseline still warming up");
            return;
        }
        let avg = mean(&baseline);
        let z = (size - avg) / std_dev(&baseline).max(STD_DEV_FLOOR);
        if z > BEHAVIOR_Z_THRESHOLD {
            out.push(
                Violation::new(
                    ViolationKind::UnusualBehavior,
                    Severity::Medium,
                    format!(
                        "Request size {size} deviates from user baseline {avg:.1} (z-score {z:.2})"
                    ),
                )
                .with_evidence(json!({ "size": size, "baseline_mean": avg, "z_score": z })),
            );
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Values more than [`OUTLIER_Z_THRESHOLD`] deviations from the mean of the
/// remaining values. Leave-one-out statistics keep a single extreme value
/// from inflating its own baseline.
fn outliers(values: &[f64]) -> Vec<Violation> {
    let n = values.len();
    if n < MIN_OUTLIER_SAMPLES {
        return Vec::new();
    }
    // Sums are taken over deviations from the global mean, not raw values.
    let center = mean(values);
    let deviations: Vec<f64> = values.iter().map(|v| v - center).collect();
    let sum: f64 = deviations.iter().sum();
    let sum_sq: f64 = deviations.iter().map(|d| d * d).sum();
    let rest = (n - 1) as f64;

    values
        .iter()
        .zip(&deviations)
        .filter_map(|(&v, &d)| {
            let m = (sum - d) / rest;
            let variance = ((sum_sq - d * d) / rest - m * m).max(0.0);
            let z = (d - m).abs() / variance.sqrt().max(STD_DEV_FLOOR);
            (z > OUTLIER_Z_THRESHOLD).then(|| {
                Violation::new(
                    ViolationKind::StatisticalAnomaly,
                    Severity::Medium,
                    format!("Statistical outlier: value {v} (z-score {z:.2})"),
                )
                .with_evidence(json!({ "value": v, "z_score": z }))
            })
        })
        .collect()
}

/// Smallest period `2..=n/2` whose block tiles the whole integer sequence.
/// Constant sequences are not reported.
fn repeating_period(values: &[f64]) -> Option<usize> {
    let n = values.len();
    if n < MIN_REPEAT_LENGTH || values.iter().any(|v| v.fract() != 0.0) {
        return None;
    }
    if values.iter().all(|v| *v == values[0]) {
        return None;
    }
    (2..=n / 2).find(|&p| n % p == 0 && (p..n).all(|i| values[i] == values[i % p]))
}

/// Longest run of one repeated character.
fn longest_run(text: &str) -> Option<(char, usize)> {
    let mut best: Option<(char, usize)> = None;
    let mut current: Option<(char, usize)> = None;
    for c in text.chars() {
        current = match current {
            Some((prev, len)) if prev == c => Some((c, len + 1)),
            _ => Some((c, 1)),
        };
        if let Some((c, len)) = current {
            if best.map_or(true, |(_, b)| len > b) {
                best = Some((c, len));
            }
        }
    }
    best
}

impl Detector for AnomalyDetector {
    fn name(&self) -> &str {
        "anomaly-detector"
    }

    fn description(&self) -> &str {
        "Detects structural, statistical, textual and behavioral anomalies"
    }

    fn check_type(&self) -> CheckType {
        CheckType::Anomaly
    }

    fn detect(&self, input: &Input, context: Option<&Context>) -> Result<CheckResult, DetectorError> {
        let mut violations = Vec::new();
        self.structural(input, &mut violations);
        self.statistical(input, &mut violations);
        self.textual(input, &mut violations);
        self.behavioral(input, context, &mut violations);

        let score = SCORES.score(&violations);
        let passed = !violations.iter().any(|v| v.severity >= Severity::High);
        Ok(CheckResult::new(CheckType::Anomaly, passed, score, violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskguard::input::InputBuilder;

    fn check(input: Input) -> CheckResult {
        AnomalyDetector::new().detect(&input, None).unwrap()
    }

    fn of_kind(result: &CheckResult, kind: ViolationKind) -> Vec<&Violation> {
        result.violations.iter().filter(|v| v.kind == kind).collect()
    }

    #[test]
    fn test_outlier_in_small_sample() {
        let result = check(Input::from(json!({"values": [10, 11, 12, 10, 11, 12, 11, 10, 11, 1000]})));
        let outliers = of_kind(&result, ViolationKind::StatisticalAnomaly);
        assert_eq!(outliers.len(), 1);
        assert!(outliers[0].message.contains("1000"));
        assert_eq!(outliers[0].evidence.as_ref().unwrap()["value"], json!(1000.0));
    }

    #[test]
    fn test_large_magnitudes_keep_precision() {
        let stamps: Vec<f64> = (0..10u32).map(|k| 1.7e12 + f64::from(k) * 1000.0).collect();
        let result = check(Input::from(json!({ "ts": stamps })));
        assert!(of_kind(&result, ViolationKind::StatisticalAnomaly).is_empty());

        let ids: Vec<f64> = (0..10u32).map(|k| 1e15 + f64::from(k) * 100.0).collect();
        let result = check(Input::from(json!(ids)));
        assert!(of_kind(&result, ViolationKind::StatisticalAnomaly).is_empty());

        let mut spiked = stamps.clone();
        spiked[9] = 1.8e12;
        let result = check(Input::from(json!({ "ts": spiked })));
        assert_eq!(of_kind(&result, ViolationKind::StatisticalAnomaly).len(), 1);
    }

    #[test]
    fn test_uniform_values_have_no_outliers() {
        let result = check(Input::from(json!([5, 6, 5, 7, 6, 5, 6])));
        assert!(of_kind(&result, ViolationKind::StatisticalAnomaly).is_empty());
    }

    #[test]
    fn test_repeating_sequence() {
        let result = check(Input::from(json!([1, 2, 3, 1, 2, 3, 1, 2, 3])));
        let repeats = of_kind(&result, ViolationKind::PatternDeviation);
        assert_eq!(repeats.len(), 1);
        assert!(repeats[0].message.contains("period 3"));
        assert_eq!(repeats[0].severity, Severity::Low);
    }

    #[test]
    fn test_repeating_period_rules() {
        assert_eq!(repeating_period(&[1.0, 2.0, 1.0, 2.0]), Some(2));
        assert_eq!(repeating_period(&[1.0, 2.0, 1.0, 2.0, 1.0]), None);
        assert_eq!(repeating_period(&[4.0, 4.0, 4.0, 4.0]), None);
        assert_eq!(repeating_period(&[1.5, 2.0, 1.5, 2.0]), None);
    }

    #[test]
    fn test_deep_nesting() {
        let mut value = json!("leaf");
        for _ in 0..15 {
            value = json!({ "n": value });
        }
        let deep = check(Input::from(value));
        assert!(deep.violations.iter().any(|v| v.message.starts_with("Deep nesting")));

        let shallow = check(Input::from(json!({"a": {"b": "c"}})));
        assert!(shallow.violations.is_empty());
    }

    #[test]
    fn test_property_count() {
        let map: serde_json::Map<String, serde_json::Value> =
            (0..1001).map(|i| (format!("k{i}"), json!("v"))).collect();
        let result = check(Input::from(serde_json::Value::Object(map)));
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.starts_with("Excessive property count")));
    }

    #[test]
    fn test_circular_reference() {
        let mut b = InputBuilder::new();
        let obj = b.object();
        b.insert(obj, "self", obj).unwrap();
        let result = check(b.build(obj));
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].message, "Circular reference detected");
        assert_eq!(result.violations[0].severity, Severity::High);
        assert!(!result.passed);
    }

    #[test]
    fn test_textual_patterns() {
        let result = check(Input::from("aaaaaaaaaaaa"));
        assert!(result.violations[0].message.contains("12 repeated"));
        assert!(check(Input::from("aaaaaaaaaa")).violations.is_empty());

        let hex = check(Input::from("hash d41d8cd98f00b204e9800998ecf8427e"));
        assert_eq!(hex.violations[0].message, "Long hexadecimal string");
        for text in [
            "tx 0xd41d8cd98f00b204e9800998ecf8427e",
            "key_d41d8cd98f00b204e9800998ecf8427e",
        ] {
            let prefixed = check(Input::from(text));
            assert_eq!(prefixed.violations.len(), 1, "{text}");
            assert_eq!(prefixed.violations[0].message, "Long hexadecimal string");
        }

        let uri = check(Input::from("src=data:image/png;base64,iVBORw0KGgo"));
        assert_eq!(uri.violations[0].message, "Embedded base64 data URI");
        assert_eq!(uri.score, 20);
    }

    #[test]
    fn test_behavioral_baseline_needs_history() {
        let detector = AnomalyDetector::new();
        let ctx = Context::for_user("u1");
        for i in 0..10 {
            let r = detector
                .detect(&Input::from("x".repeat(10 + i % 3)), Some(&ctx))
                .unwrap();
            assert!(of_kind(&r, ViolationKind::UnusualBehavior).is_empty());
        }
        let normal = detector.detect(&Input::from("x".repeat(11)), Some(&ctx)).unwrap();
        assert!(of_kind(&normal, ViolationKind::UnusualBehavior).is_empty());

        let big = detector.detect(&Input::from("y".repeat(200)), Some(&ctx)).unwrap();
        assert_eq!(of_kind(&big, ViolationKind::UnusualBehavior).len(), 1);
        assert_eq!(detector.history().samples("user_u1_request_size").len(), 12);
    }

    #[test]
    fn test_behavioral_history_is_per_user_and_injectable() {
        let store = InMemoryHistory::shared(100);
        let detector = AnomalyDetector::with_history(store.clone());
        for _ in 0..12 {
            detector
                .detect(&Input::from("abc"), Some(&Context::for_user("a")))
                .unwrap();
        }
        let other = detector
            .detect(&Input::from("z".repeat(300)), Some(&Context::for_user("b")))
            .unwrap();
        assert!(of_kind(&other, ViolationKind::UnusualBehavior).is_empty());
        assert_eq!(store.samples("user_a_request_size").len(), 12);
        assert_eq!(store.samples("user_b_request_size").len(), 1);
    }

    #[test]
    fn test_no_user_means_no_history() {
        let detector = AnomalyDetector::new();
        detector.detect(&Input::from("abc"), None).unwrap();
        detector.detect(&Input::from("abc"), Some(&Context::new())).unwrap();
        assert!(detector.history().samples("user__request_size").is_empty());
    }
}

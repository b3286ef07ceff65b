pub mod aggregate;
pub mod custom;
pub mod types;

pub use custom::{CustomRulesDetector, CUSTOM_RULES_DETECTOR};
pub use types::{RiskLevel, ScoreResult};

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError, ConfigUpdate};
use crate::detector::registry::run_one;
use crate::detector::{Context, Detector, DetectorRegistry, DetectorRun};
use crate::finding::CheckType;
use crate::input::Input;

/// Runs enabled detectors over one input and pools their results.
///
/// Holds no per-call state: concurrent `score` calls are safe. Detectors
/// with memory (behavioral baselines) own their state behind their own locks.
pub struct Scorer {
    registry: DetectorRegistry,
    config: Config,
    custom_rules: Option<CustomRulesDetector>,
}

impl Scorer {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_detectors(config, Vec::new())
    }

    pub fn with_detectors(
        config: Config,
        detectors: Vec<Box<dyn Detector>>,
    ) -> Result<Self, ConfigError> {
        let mut registry = DetectorRegistry::new();
        registry.register_all(detectors);
        let custom_rules = build_custom_rules(&config)?;
        Ok(Self {
            registry,
            config,
            custom_rules,
        })
    }

    /// Register a detector; the last registration for a name wins.
    pub fn register_detector(&mut self, detector: Box<dyn Detector>) {
        self.registry.register(detector);
    }

    pub fn detectors(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shallow-merge `update` into the live config. Takes effect on the next call.
    /// An invalid update leaves the current config untouched.
    pub fn update_config(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let next = self.config.merged(update)?;
        self.custom_rules = build_custom_rules(&next)?;
        self.config = next;
        Ok(())
    }

    pub fn score(&self, input: &Input, context: Option<&Context>) -> ScoreResult {
        let mut runs = self
            .registry
            .run_enabled(&self.config.enabled_detectors, input, context);
        if let Some(custom) = &self.custom_rules {
            runs.push(run_one(custom, input, context));
        }

        let mut detector_scores = BTreeMap::new();
        let mut weighted: Vec<(CheckType, u8)> = Vec::with_capacity(runs.len());
        let mut violations = Vec::new();
        let mut failed_detectors = Vec::new();

        for DetectorRun {
            name,
            check_type,
            outcome,
        } in runs
        {
            match outcome {
                Ok(result) => {
                    debug!(
                        detector = %name,
                        score = result.score,
                        violations = result.violations.len(),
                        "detector finished"
                    );
                    detector_scores.insert(name, result.score);
                    weighted.push((check_type, result.score));
                    violations.extend(result.violations);
                }
                Err(e) => {
                    if self.config.logging {
                        warn!(detector = %name, error = %e, "detector failed; scoring it as 0");
                    }
                    detector_scores.insert(name.clone(), 0);
                    weighted.push((check_type, 0));
                    failed_detectors.push(name);
                }
            }
        }

        let aggregated_violations = aggregate::merge_violations(violations);
        let overall_score = aggregate::overall_score(&weighted, &aggregated_violations);
        let risk_level = RiskLevel::from_score(overall_score);
        let passed = if self.config.strict_mode {
            aggregated_violations.is_empty()
        } else {
            f64::from(overall_score) < self.config.score_threshold
        };
        let recommendations = aggregate::recommendations(risk_level, &aggregated_violations);

        info!(
            overall_score,
            risk = %risk_level,
            passed,
            violations = aggregated_violations.len(),
            "input scored"
        );

        ScoreResult {
            overall_score,
            detector_scores,
            aggregated_violations,
            passed,
            risk_level,
            recommendations,
            timestamp: Utc::now(),
            failed_detectors,
        }
    }
}

fn build_custom_rules(config: &Config) -> Result<Option<CustomRulesDetector>, ConfigError> {
    if config.custom_rules.is_empty() {
        return Ok(None);
    }
    Ok(Some(CustomRulesDetector::new(config.compile_custom_rules()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorError;
    use crate::finding::*;
    use crate::pattern::CustomRule;
    use std::collections::HashSet;

    struct StaticDetector {
        name: &'static str,
        check_type: CheckType,
        score: u8,
        violations: Vec<Violation>,
    }

    impl Detector for StaticDetector {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Returns canned violations for testing"
        }
        fn check_type(&self) -> CheckType {
            self.check_type
        }
        fn detect(&self, _input: &Input, _context: Option<&Context>) -> Result<CheckResult, DetectorError> {
            Ok(CheckResult::new(
                self.check_type,
                self.violations.is_empty(),
                self.score,
                self.violations.clone(),
            ))
        }
    }

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "Always errors"
        }
        fn check_type(&self) -> CheckType {
            CheckType::Anomaly
        }
        fn detect(&self, _input: &Input, _context: Option<&Context>) -> Result<CheckResult, DetectorError> {
            Err(DetectorError::Failed {
                detector: "failing".into(),
                reason: "synthetic".into(),
            })
        }
    }

    fn stat(name: &'static str, check_type: CheckType, score: u8, violations: Vec<Violation>) -> Box<dyn Detector> {
        Box::new(StaticDetector {
            name,
            check_type,
            score,
            violations,
        })
    }

    fn low(kind: ViolationKind) -> Violation {
        Violation::new(kind, Severity::Low, "low finding")
    }

    #[test]
    fn test_clean_input_passes_with_no_risk() {
        let scorer = Scorer::with_detectors(
            Config::default(),
            vec![stat("sec", CheckType::Security, 0, vec![])],
        )
        .unwrap();
        let result = scorer.score(&Input::from("hello"), None);
        assert_eq!(result.overall_score, 0);
        assert_eq!(result.risk_level, RiskLevel::None);
        assert!(result.passed);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_failed_detector_scores_zero_without_aborting() {
        let scorer = Scorer::with_detectors(
            Config::default(),
            vec![
                Box::new(FailingDetector),
                stat("sec", CheckType::Security, 50, vec![low(ViolationKind::Xss)]),
            ],
        )
        .unwrap();
        let result = scorer.score(&Input::from("x"), None);
        assert_eq!(result.detector_scores["failing"], 0);
        assert_eq!(result.failed_detectors, vec!["failing".to_string()]);
        // 50 * 1.5 / (1.0 + 1.5) = 30
        assert_eq!(result.overall_score, 30);
    }

    #[test]
    fn test_disabled_check_types_do_not_run() {
        let mut config = Config::default();
        config.enabled_detectors = vec![CheckType::Security];
        let scorer = Scorer::with_detectors(
            config,
            vec![
                stat("sec", CheckType::Security, 0, vec![]),
                stat("mock", CheckType::MockDetection, 100, vec![low(ViolationKind::MockUsage)]),
            ],
        )
        .unwrap();
        let result = scorer.score(&Input::from("x"), None);
        assert!(!result.detector_scores.contains_key("mock"));
        assert!(result.aggregated_violations.is_empty());
    }

    #[test]
    fn test_strict_mode_fails_on_any_violation() {
        let detectors = || vec![stat("anom", CheckType::Anomaly, 5, vec![low(ViolationKind::SuspiciousPattern)])];
        let lenient = Scorer::with_detectors(Config::default(), detectors()).unwrap();
        assert!(lenient.score(&Input::from("x"), None).passed);

        let mut strict = Scorer::with_detectors(Config::default(), detectors()).unwrap();
        strict
            .update_config(ConfigUpdate {
                strict_mode: Some(true),
                ..ConfigUpdate::default()
            })
            .unwrap();
        assert!(!strict.score(&Input::from("x"), None).passed);
    }

    #[test]
    fn test_aggregated_violations_are_unique_per_kind_and_severity() {
        let scorer = Scorer::with_detectors(
            Config::default(),
            vec![
                stat("a", CheckType::Security, 10, vec![low(ViolationKind::Xss), low(ViolationKind::Xss)]),
                stat("b", CheckType::Anomaly, 10, vec![low(ViolationKind::Xss)]),
            ],
        )
        .unwrap();
        let result = scorer.score(&Input::from("x"), None);
        let keys: HashSet<_> = result
            .aggregated_violations
            .iter()
            .map(|v| (v.kind, v.severity))
            .collect();
        assert_eq!(keys.len(), result.aggregated_violations.len());
        assert_eq!(result.aggregated_violations[0].message, "low finding (3 occurrences)");
    }

    #[test]
    fn test_custom_rules_run_as_extra_detector() {
        let mut scorer = Scorer::new(Config::default()).unwrap();
        scorer
            .update_config(ConfigUpdate {
                custom_rules: Some(vec![CustomRule {
                    name: "internal-host".into(),
                    pattern: r"corp\.internal".into(),
                    kind: ViolationKind::UnauthorizedAccess,
                    severity: Severity::High,
                    message: "internal host {match}".into(),
                }]),
                ..ConfigUpdate::default()
            })
            .unwrap();
        let result = scorer.score(&Input::from("see db.corp.internal"), None);
        assert_eq!(result.detector_scores[CUSTOM_RULES_DETECTOR], 45);
        assert_eq!(result.aggregated_violations.len(), 1);
        assert_eq!(result.aggregated_violations[0].message, "internal host corp.internal");
    }

    #[test]
    fn test_invalid_update_keeps_previous_config() {
        let mut scorer = Scorer::new(Config::default()).unwrap();
        let err = scorer.update_config(ConfigUpdate {
            score_threshold: Some(-1.0),
            strict_mode: Some(true),
            ..ConfigUpdate::default()
        });
        assert!(err.is_err());
        assert!(!scorer.config().strict_mode);
    }
}

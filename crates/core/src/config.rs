use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::finding::CheckType;
use crate::pattern::{CustomRule, RuleTable};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("custom rule '{name}' has an invalid pattern: {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("score threshold must be within 0..=100, got {0}")]
    InvalidThreshold(f64),
}

/// Scoring configuration, loadable from `.riskguard.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Check types whose detectors run on each score call.
    pub enabled_detectors: Vec<CheckType>,
    /// Non-strict mode passes when the overall score is below this value.
    pub score_threshold: f64,
    /// Strict mode fails on any violation at all.
    pub strict_mode: bool,
    /// Log detector failures.
    pub logging: bool,
    pub custom_rules: Vec<CustomRule>,
    /// Glob patterns for files `riskguard scan` skips.
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled_detectors: vec![
                CheckType::InputValidation,
                CheckType::Security,
                CheckType::MockDetection,
                CheckType::Anomaly,
            ],
            score_threshold: 30.0,
            strict_mode: false,
            logging: true,
            custom_rules: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// Partial configuration. Each present field replaces the live value wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub enabled_detectors: Option<Vec<CheckType>>,
    pub score_threshold: Option<f64>,
    pub strict_mode: Option<bool>,
    pub logging: Option<bool>,
    pub custom_rules: Option<Vec<CustomRule>>,
    pub exclude: Option<Vec<String>>,
}

impl Config {
    /// Load config from a TOML file path. Returns default config if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.score_threshold) {
            return Err(ConfigError::InvalidThreshold(self.score_threshold));
        }
        self.compile_custom_rules().map(|_| ())
    }

    pub fn compile_custom_rules(&self) -> Result<RuleTable, ConfigError> {
        RuleTable::from_custom(&self.custom_rules)
            .map_err(|(name, source)| ConfigError::InvalidRule { name, source })
    }

    pub fn is_enabled(&self, check_type: CheckType) -> bool {
        self.enabled_detectors.contains(&check_type)
    }

    /// Shallow-merge `update` into a copy of this config and validate the result.
    pub fn merged(&self, update: ConfigUpdate) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = update.enabled_detectors {
            next.enabled_detectors = v;
        }
        if let Some(v) = update.score_threshold {
            next.score_threshold = v;
        }
        if let Some(v) = update.strict_mode {
            next.strict_mode = v;
        }
        if let Some(v) = update.logging {
            next.logging = v;
        }
        if let Some(v) = update.custom_rules {
            next.custom_rules = v;
        }
        if let Some(v) = update.exclude {
            next.exclude = v;
        }
        next.validate()?;
        Ok(next)
    }

    /// Check if a file path should be excluded based on glob patterns.
    pub fn is_file_excluded(&self, file_path: &Path) -> bool {
        let path_str = file_path.to_string_lossy();
        self.exclude
            .iter()
            .any(|pattern| glob::Pattern::new(pattern).is_ok_and(|p| p.matches(&path_str)))
    }

    /// Generate default config file content.
    pub fn default_toml() -> &'static str {
        r#"# riskguard configuration

# Detector categories to run: "input-validation", "security",
# "mock-detection", "anomaly"
enabled_detectors = ["input-validation", "security", "mock-detection", "anomaly"]

# Inputs scoring at or above this value fail (ignored in strict mode)
score_threshold = 30

# Fail on any violation regardless of score
strict_mode = false

# Log detector failures
logging = true

# Glob patterns for files `riskguard scan` skips
exclude = ["target/**", "node_modules/**"]

# Extra pattern rules, evaluated as the "custom-rules" detector
# [[custom_rules]]
# name = "internal-hostname"
# pattern = 'corp\.internal'
# kind = "unauthorized-access"
# severity = "medium"
# message = "Internal hostname exposed: {match}"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Severity, ViolationKind};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.score_threshold, 30.0);
        assert!(!config.strict_mode);
        assert!(config.is_enabled(CheckType::Security));
        assert!(!config.is_enabled(CheckType::Custom));
    }

    #[test]
    fn test_default_toml_parses_to_defaults() {
        let config: Config = toml::from_str(Config::default_toml()).unwrap();
        assert_eq!(config.enabled_detectors, Config::default().enabled_detectors);
        assert_eq!(config.score_threshold, 30.0);
        assert!(config.is_file_excluded(Path::new("target/debug/x.rs")));
        assert!(!config.is_file_excluded(Path::new("src/main.rs")));
    }

    #[test]
    fn test_parse_custom_rules() {
        let toml = r#"
strict_mode = true

[[custom_rules]]
name = "internal-host"
pattern = 'corp\.internal'
kind = "unauthorized-access"
severity = "medium"
message = "internal host {match}"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.strict_mode);
        assert_eq!(config.custom_rules.len(), 1);
        assert_eq!(config.custom_rules[0].kind, ViolationKind::UnauthorizedAccess);
        assert_eq!(config.custom_rules[0].severity, Severity::Medium);
        assert_eq!(config.compile_custom_rules().unwrap().len(), 1);
    }

    #[test]
    fn test_merge_replaces_only_present_fields() {
        let base = Config::default();
        let next = base
            .merged(ConfigUpdate {
                strict_mode: Some(true),
                enabled_detectors: Some(vec![CheckType::Security]),
                ..ConfigUpdate::default()
            })
            .unwrap();
        assert!(next.strict_mode);
        assert_eq!(next.enabled_detectors, vec![CheckType::Security]);
        assert_eq!(next.score_threshold, base.score_threshold);
        assert_eq!(next.logging, base.logging);
    }

    #[test]
    fn test_merge_rejects_invalid_values() {
        let base = Config::default();
        let err = base
            .merged(ConfigUpdate {
                score_threshold: Some(150.0),
                ..ConfigUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(_)));

        let err = base
            .merged(ConfigUpdate {
                custom_rules: Some(vec![CustomRule {
                    name: "bad".into(),
                    pattern: "(".into(),
                    kind: ViolationKind::SuspiciousPattern,
                    severity: Severity::Low,
                    message: "x".into(),
                }]),
                ..ConfigUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_missing_file_yields_default() {
        let config = Config::load(Path::new("/nonexistent/.riskguard.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}

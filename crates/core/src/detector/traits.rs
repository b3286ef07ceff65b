use thiserror::Error;

use super::context::Context;
use crate::finding::{CheckResult, CheckType};
use crate::input::{Input, InputError};

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector '{detector}' failed: {reason}")]
    Failed { detector: String, reason: String },
    #[error("detector '{detector}' panicked")]
    Panicked { detector: String },
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Core trait for all risk detectors.
/// Implementors inspect one input and return a scored check result.
pub trait Detector: Send + Sync {
    /// Unique identifier for this detector (e.g., "security-detector")
    fn name(&self) -> &str;

    /// Human-readable description of what this detector checks
    fn description(&self) -> &str;

    /// Category used for enablement and score weighting
    fn check_type(&self) -> CheckType;

    /// Inspect `input`. Well-formed input never produces an error; input the
    /// detector cannot interpret yields a passing result with no violations.
    fn detect(&self, input: &Input, context: Option<&Context>) -> Result<CheckResult, DetectorError>;
}

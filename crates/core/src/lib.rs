pub mod config;
pub mod detector;
pub mod finding;
pub mod history;
pub mod input;
pub mod pattern;
pub mod report;
pub mod scorer;

pub use config::{Config, ConfigError, ConfigUpdate};
pub use detector::{Context, Detector, DetectorError};
pub use finding::{CheckResult, CheckType, Severity, Violation, ViolationKind};
pub use input::{Input, InputBuilder};
pub use report::{ExportFormat, Report, Reporter};
pub use scorer::{RiskLevel, ScoreResult, Scorer};
